//! Job persistence: upsert, point lookup, composable query, aging cleanup.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::domain::models::{
    normalize_company_name, CompanyEnrichment, JobDetail, JobFilters, JobView, SortBy,
};

#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Batched insert-or-replace keyed by `id`. Returns the number of rows
    /// written. Auto-fills `normalized_company_name`/`last_seen`; preserves
    /// the earliest known `scraped_at` across repeated upserts of the same id.
    pub async fn upsert_jobs(&self, records: &[JobDetail]) -> Result<u64> {
        let mut affected = 0u64;
        for job in records {
            let normalized = if job.normalized_company_name.is_empty() {
                normalize_company_name(&job.company)
            } else {
                job.normalized_company_name.clone()
            };
            let skills_json = serde_json::to_string(&job.skills).unwrap_or_else(|_| "[]".into());

            let result = sqlx::query(
                r#"
                INSERT INTO jobs (
                    id, title, company, normalized_company_name, location,
                    posted_date, posted_date_iso, url, company_url,
                    salary_min, salary_max, salary_currency, equity_offered,
                    remote_eligible, visa_sponsorship, skills, easy_apply,
                    raw_description, employment_type, seniority_level, job_function,
                    industries, number_of_applicants, benefits_badge, profile_id,
                    scraped_at, last_seen
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27
                )
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    company = excluded.company,
                    normalized_company_name = excluded.normalized_company_name,
                    location = excluded.location,
                    posted_date = excluded.posted_date,
                    posted_date_iso = excluded.posted_date_iso,
                    url = excluded.url,
                    company_url = excluded.company_url,
                    salary_min = excluded.salary_min,
                    salary_max = excluded.salary_max,
                    salary_currency = excluded.salary_currency,
                    equity_offered = excluded.equity_offered,
                    remote_eligible = excluded.remote_eligible,
                    visa_sponsorship = excluded.visa_sponsorship,
                    skills = excluded.skills,
                    easy_apply = excluded.easy_apply,
                    raw_description = excluded.raw_description,
                    employment_type = excluded.employment_type,
                    seniority_level = excluded.seniority_level,
                    job_function = excluded.job_function,
                    industries = excluded.industries,
                    number_of_applicants = excluded.number_of_applicants,
                    benefits_badge = excluded.benefits_badge,
                    profile_id = excluded.profile_id,
                    scraped_at = MIN(jobs.scraped_at, excluded.scraped_at),
                    last_seen = excluded.last_seen
                "#,
            )
            .bind(&job.id)
            .bind(&job.title)
            .bind(&job.company)
            .bind(&normalized)
            .bind(&job.location)
            .bind(&job.posted_date)
            .bind(&job.posted_date_iso)
            .bind(&job.url)
            .bind(&job.company_url)
            .bind(job.salary_min)
            .bind(job.salary_max)
            .bind(&job.salary_currency)
            .bind(job.equity_offered)
            .bind(job.remote_eligible)
            .bind(job.visa_sponsorship)
            .bind(&skills_json)
            .bind(job.easy_apply)
            .bind(&job.raw_description)
            .bind(&job.employment_type)
            .bind(&job.seniority_level)
            .bind(&job.job_function)
            .bind(&job.industries)
            .bind(&job.number_of_applicants)
            .bind(&job.benefits_badge)
            .bind(job.profile_id)
            .bind(job.scraped_at.to_rfc3339())
            .bind(job.last_seen.to_rfc3339())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to upsert job {}", job.id))?;

            affected += result.rows_affected();
        }
        Ok(affected)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobView>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(Self::select_with_joins());
        qb.push(" WHERE j.id = ");
        qb.push_bind(job_id.to_string());
        let row = qb.build().fetch_optional(&self.pool).await.context("get_job")?;
        Ok(row.map(row_to_view))
    }

    pub async fn query_jobs(
        &self,
        filters: &JobFilters,
        limit: i64,
        offset: i64,
        sort_by: SortBy,
    ) -> Result<Vec<JobView>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(Self::select_with_joins());
        Self::push_where(&mut qb, filters);
        qb.push(match sort_by {
            SortBy::PostedDateDesc => " ORDER BY j.posted_date_iso DESC",
            SortBy::ScrapedAtDesc => " ORDER BY j.scraped_at DESC",
            SortBy::Applicants => " ORDER BY CAST(j.number_of_applicants AS INTEGER) DESC",
        });
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb.build().fetch_all(&self.pool).await.context("query_jobs")?;
        Ok(rows.into_iter().map(row_to_view).collect())
    }

    pub async fn count_jobs(&self, filters: &JobFilters) -> Result<i64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) AS n FROM jobs j LEFT JOIN applications a ON a.job_id = j.id",
        );
        Self::push_where(&mut qb, filters);
        let row = qb.build().fetch_one(&self.pool).await.context("count_jobs")?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    pub async fn delete_old_jobs(&self, max_age_seconds: i64) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::seconds(max_age_seconds);
        let result = sqlx::query("DELETE FROM jobs WHERE scraped_at < ?1")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .context("delete_old_jobs")?;
        Ok(result.rows_affected())
    }

    fn select_with_joins() -> &'static str {
        r#"
        SELECT j.*, a.status AS application_status,
               ce.normalized_company_name AS ce_normalized_company_name,
               ce.display_name AS ce_display_name, ce.size AS ce_size,
               ce.industry AS ce_industry, ce.description AS ce_description,
               ce.website AS ce_website, ce.headquarters AS ce_headquarters,
               ce.founded_year AS ce_founded_year, ce.specialties AS ce_specialties,
               ce.profile_url AS ce_profile_url, ce.scraped_at AS ce_scraped_at,
               ce.next_refresh_at AS ce_next_refresh_at
        FROM jobs j
        LEFT JOIN applications a ON a.job_id = j.id
        LEFT JOIN company_enrichment ce ON ce.normalized_company_name = j.normalized_company_name
        "#
    }

    fn push_where<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filters: &'a JobFilters) {
        let mut first = true;
        macro_rules! clause {
            () => {{
                qb.push(if first { " WHERE " } else { " AND " });
                first = false;
            }};
        }

        if let Some(company) = &filters.company {
            clause!();
            qb.push("j.normalized_company_name LIKE ");
            qb.push_bind(format!("%{}%", normalize_company_name(company)));
        }
        if let Some(location) = &filters.location {
            clause!();
            qb.push("LOWER(j.location) LIKE ");
            qb.push_bind(format!("%{}%", location.to_lowercase()));
        }
        if let Some(keywords) = &filters.keywords {
            clause!();
            qb.push("j.rowid IN (SELECT rowid FROM jobs_fts WHERE jobs_fts MATCH ");
            qb.push_bind(keywords.clone());
            qb.push(")");
        }
        if let Some(hours) = filters.posted_after_hours {
            let cutoff = (Utc::now() - chrono::Duration::hours(hours)).to_rfc3339();
            clause!();
            qb.push("j.posted_date_iso >= ");
            qb.push_bind(cutoff);
        }
        if filters.remote_only {
            clause!();
            qb.push("j.remote_eligible = 1");
        }
        if filters.visa_sponsorship {
            clause!();
            qb.push("j.visa_sponsorship = 1");
        }
        if let Some(status) = &filters.application_status {
            clause!();
            if status == "not_applied" {
                qb.push("a.status IS NULL");
            } else {
                qb.push("a.status = ");
                qb.push_bind(status.clone());
            }
        }
    }
}

fn row_to_view(row: sqlx::sqlite::SqliteRow) -> JobView {
    let skills: Vec<String> = row
        .try_get::<String, _>("skills")
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();

    let parse_dt = |s: String| -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    };

    let detail = JobDetail {
        id: row.get("id"),
        title: row.get("title"),
        company: row.get("company"),
        normalized_company_name: row.get("normalized_company_name"),
        location: row.get("location"),
        posted_date: row.get("posted_date"),
        posted_date_iso: row.get("posted_date_iso"),
        url: row.get("url"),
        company_url: row.get("company_url"),
        salary_min: row.try_get("salary_min").ok(),
        salary_max: row.try_get("salary_max").ok(),
        salary_currency: row.get("salary_currency"),
        equity_offered: row.get("equity_offered"),
        remote_eligible: row.get("remote_eligible"),
        visa_sponsorship: row.get("visa_sponsorship"),
        skills,
        easy_apply: row.get("easy_apply"),
        raw_description: row.get("raw_description"),
        employment_type: row.get("employment_type"),
        seniority_level: row.get("seniority_level"),
        job_function: row.get("job_function"),
        industries: row.get("industries"),
        number_of_applicants: row.get("number_of_applicants"),
        benefits_badge: row.get("benefits_badge"),
        profile_id: row.try_get("profile_id").ok(),
        scraped_at: parse_dt(row.get("scraped_at")),
        last_seen: parse_dt(row.get("last_seen")),
    };

    let application_status: Option<String> = row.try_get("application_status").ok();
    let application_status = application_status.and_then(|s| s.parse().ok());

    let ce_name: Option<String> = row.try_get("ce_normalized_company_name").ok();
    let company_enrichment = ce_name.map(|normalized_company_name| {
        let specialties: Vec<String> = row
            .try_get::<String, _>("ce_specialties")
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        CompanyEnrichment {
            normalized_company_name,
            display_name: row.get("ce_display_name"),
            size: row.try_get("ce_size").ok(),
            industry: row.try_get("ce_industry").ok(),
            description: row.try_get("ce_description").ok(),
            website: row.try_get("ce_website").ok(),
            headquarters: row.try_get("ce_headquarters").ok(),
            founded_year: row.try_get("ce_founded_year").ok(),
            specialties,
            profile_url: row.try_get("ce_profile_url").ok(),
            scraped_at: parse_dt(row.get("ce_scraped_at")),
            next_refresh_at: parse_dt(row.get("ce_next_refresh_at")),
        }
    });

    JobView {
        detail,
        application_status,
        company_enrichment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;

    fn sample_job(id: &str) -> JobDetail {
        let mut d = JobDetail::sentinel(id);
        d.title = "Engineer".into();
        d.company = "Acme Corp".into();
        d.normalized_company_name = normalize_company_name(&d.company);
        d.posted_date_iso = "2024-01-01T00:00:00Z".into();
        d
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let pool = init_memory_db().await.unwrap();
        let repo = JobRepository::new(pool);
        repo.upsert_jobs(&[sample_job("1")]).await.unwrap();
        let view = repo.get_job("1").await.unwrap().unwrap();
        assert_eq!(view.detail.title, "Engineer");
        assert_eq!(view.detail.normalized_company_name, "acme");
    }

    #[tokio::test]
    async fn double_upsert_is_idempotent() {
        let pool = init_memory_db().await.unwrap();
        let repo = JobRepository::new(pool);
        repo.upsert_jobs(&[sample_job("1")]).await.unwrap();
        repo.upsert_jobs(&[sample_job("1")]).await.unwrap();
        let count = repo.count_jobs(&JobFilters::default()).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn query_jobs_filters_by_remote() {
        let pool = init_memory_db().await.unwrap();
        let repo = JobRepository::new(pool);
        let mut remote = sample_job("1");
        remote.remote_eligible = true;
        let onsite = sample_job("2");
        repo.upsert_jobs(&[remote, onsite]).await.unwrap();

        let filters = JobFilters {
            remote_only: true,
            ..Default::default()
        };
        let results = repo.query_jobs(&filters, 10, 0, SortBy::PostedDateDesc).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].detail.id, "1");
    }

    #[tokio::test]
    async fn query_jobs_filters_by_keywords_via_fts() {
        let pool = init_memory_db().await.unwrap();
        let repo = JobRepository::new(pool);
        let mut rust_job = sample_job("1");
        rust_job.title = "Senior Rust Engineer".into();
        let mut other_job = sample_job("2");
        other_job.title = "Product Manager".into();
        repo.upsert_jobs(&[rust_job, other_job]).await.unwrap();

        let filters = JobFilters {
            keywords: Some("Rust".into()),
            ..Default::default()
        };
        let results = repo.query_jobs(&filters, 10, 0, SortBy::PostedDateDesc).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].detail.id, "1");
    }
}
