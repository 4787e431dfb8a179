//! Core entity types shared by the store, parser, and scraper pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Suffixes stripped (case-insensitively) when normalizing a company name.
const COMPANY_SUFFIXES: [&str; 8] = [
    ", inc.", " inc", " llc", " ltd", " corp", " corporation", " limited", " co.",
];

/// Lowercase, strip a fixed set of legal-entity suffixes, trim whitespace.
pub fn normalize_company_name(company: &str) -> String {
    let mut name = company.trim().to_lowercase();
    loop {
        let stripped = COMPANY_SUFFIXES.iter().find_map(|suffix| {
            name.strip_suffix(suffix).map(|s| s.trim_end().to_string())
        });
        match stripped {
            Some(next) if next != name => name = next,
            _ => break,
        }
    }
    name.trim().to_string()
}

/// A named search configuration the scheduler spawns one worker per.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub keywords: String,
    pub distance: i64,
    pub time_filter: String,
    pub refresh_interval: i64,
    pub enabled: bool,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating or updating a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub location: String,
    pub keywords: String,
    pub distance: i64,
    pub time_filter: String,
    pub refresh_interval: i64,
    pub enabled: bool,
}

/// Lightweight record parsed from a listing card. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub title: String,
    pub company: String,
    pub company_url: String,
    pub location: String,
    pub posted_date: String,
    pub posted_date_iso: String,
    pub url: String,
    pub benefits_badge: String,
}

impl JobSummary {
    /// All-sentinel summary, used when a card fails to parse.
    pub fn sentinel() -> Self {
        Self {
            id: "N/A".into(),
            title: "N/A".into(),
            company: "N/A".into(),
            company_url: "N/A".into(),
            location: "N/A".into(),
            posted_date: "N/A".into(),
            posted_date_iso: "N/A".into(),
            url: "N/A".into(),
            benefits_badge: "N/A".into(),
        }
    }
}

/// Full record parsed from a detail page, keyed by job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub id: String,
    pub title: String,
    pub company: String,
    pub normalized_company_name: String,
    pub location: String,
    pub posted_date: String,
    pub posted_date_iso: String,
    pub url: String,
    pub company_url: String,

    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: String,
    pub equity_offered: bool,
    pub remote_eligible: bool,
    pub visa_sponsorship: bool,
    pub skills: Vec<String>,
    pub easy_apply: bool,

    pub raw_description: String,
    pub employment_type: String,
    pub seniority_level: String,
    pub job_function: String,
    pub industries: String,
    pub number_of_applicants: String,
    pub benefits_badge: String,

    pub profile_id: Option<i64>,
    pub scraped_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl JobDetail {
    /// All-sentinel detail, used when a detail page fails to parse or fetch.
    /// The id is preserved so the pipeline can still log which job failed.
    pub fn sentinel(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: "N/A".into(),
            company: "N/A".into(),
            normalized_company_name: "n/a".into(),
            location: "N/A".into(),
            posted_date: "N/A".into(),
            posted_date_iso: "N/A".into(),
            url: "N/A".into(),
            company_url: "N/A".into(),
            salary_min: None,
            salary_max: None,
            salary_currency: "USD".into(),
            equity_offered: false,
            remote_eligible: false,
            visa_sponsorship: false,
            skills: Vec::new(),
            easy_apply: false,
            raw_description: String::new(),
            employment_type: "N/A".into(),
            seniority_level: "N/A".into(),
            job_function: "N/A".into(),
            industries: "N/A".into(),
            number_of_applicants: "N/A".into(),
            benefits_badge: "N/A".into(),
            profile_id: None,
            scraped_at: now,
            last_seen: now,
        }
    }

    pub fn is_sentinel_record(&self) -> bool {
        self.title == "N/A" || self.company == "N/A"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Interviewing,
    Rejected,
    Offered,
    Accepted,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Interviewing => "interviewing",
            Self::Rejected => "rejected",
            Self::Offered => "offered",
            Self::Accepted => "accepted",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(Self::Applied),
            "interviewing" => Ok(Self::Interviewing),
            "rejected" => Ok(Self::Rejected),
            "offered" => Ok(Self::Offered),
            "accepted" => Ok(Self::Accepted),
            other => Err(anyhow::anyhow!("unknown application status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub job_id: String,
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An application row joined with the job fields it's commonly displayed
/// alongside, as returned by `list_applications`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationView {
    pub application: Application,
    pub job_title: String,
    pub job_company: String,
    pub job_location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyEnrichment {
    pub normalized_company_name: String,
    pub display_name: String,
    pub size: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub headquarters: Option<String>,
    pub founded_year: Option<i64>,
    pub specialties: Vec<String>,
    pub profile_url: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub next_refresh_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobChange {
    pub id: i64,
    pub job_id: String,
    pub changed_at: DateTime<Utc>,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Composable filters for `query_jobs` / `count_jobs`. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct JobFilters {
    pub company: Option<String>,
    pub location: Option<String>,
    pub keywords: Option<String>,
    pub posted_after_hours: Option<i64>,
    pub remote_only: bool,
    pub visa_sponsorship: bool,
    pub application_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    PostedDateDesc,
    ScrapedAtDesc,
    Applicants,
}

impl Default for SortBy {
    fn default() -> Self {
        Self::PostedDateDesc
    }
}

/// A `jobs` row joined with its application and enrichment data, as returned
/// by `query_jobs` / `get_job`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub detail: JobDetail,
    pub application_status: Option<ApplicationStatus>,
    pub company_enrichment: Option<CompanyEnrichment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_suffixes() {
        assert_eq!(normalize_company_name("Acme Corp"), "acme");
        assert_eq!(normalize_company_name("Acme, Inc."), "acme");
        assert_eq!(normalize_company_name("Acme LLC"), "acme");
        assert_eq!(normalize_company_name("  Acme Ltd  "), "acme");
        assert_eq!(normalize_company_name("Acme Corporation"), "acme");
        assert_eq!(normalize_company_name("Acme Co."), "acme");
    }

    #[test]
    fn normalize_is_idempotent_on_plain_names() {
        assert_eq!(normalize_company_name("OpenAI"), "openai");
        assert_eq!(normalize_company_name("openai"), "openai");
    }

    #[test]
    fn sentinel_detail_is_dropped_by_is_sentinel_record() {
        let d = JobDetail::sentinel("123");
        assert!(d.is_sentinel_record());
        assert_eq!(d.id, "123");
    }
}
