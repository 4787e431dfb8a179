//! One acquisition cycle for a single profile: search → fetch details →
//! diff against the store → upsert.

use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;
use tokio::sync::Semaphore;

use crate::config;
use crate::domain::models::{JobDetail, JobSummary, Profile};
use crate::fetcher;
use crate::parser;
use crate::repository::Store;

const SENTINEL: &str = "N/A";

/// Run one full cycle for `profile`: fetch listing pages, fetch and parse
/// every detail concurrently (bounded by `job_semaphore`), diff tracked
/// fields against what's on file, and upsert. Returns the affected row count.
pub async fn scrape_once(
    profile: &Profile,
    store: &Store,
    client: &Client,
    job_semaphore: &Arc<Semaphore>,
) -> Result<u64> {
    let summaries = fetch_listing_summaries(profile, client).await?;
    if summaries.is_empty() {
        return Ok(0);
    }

    let details = fetch_details(&summaries, client, job_semaphore).await;

    let mut batch = Vec::with_capacity(details.len());
    for mut detail in details {
        if detail.title == SENTINEL || detail.company == SENTINEL {
            log::debug!("dropping sentinel detail for job {}", detail.id);
            continue;
        }
        detail.profile_id = Some(profile.id);

        if let Some(existing) = store.get_job(&detail.id).await? {
            diff_and_record(store, &existing.detail, &detail).await?;
        }

        batch.push(detail);
    }

    if batch.is_empty() {
        return Ok(0);
    }

    store.upsert_jobs(&batch).await
}

async fn fetch_listing_summaries(profile: &Profile, client: &Client) -> Result<Vec<JobSummary>> {
    let mut summaries = Vec::new();
    for page in 0..config::SEARCH_PAGES {
        let start = page * config::PAGE_SIZE;
        let url = listing_url(profile, start);
        let html = fetcher::request_listing_with_backoff(
            client,
            &url,
            config::DEFAULT_MAX_RETRIES,
            config::DEFAULT_BASE_DELAY,
        )
        .await?;

        let mut page_summaries: Vec<JobSummary> = parser::parse_search_results_page(&html)
            .into_iter()
            .filter(|s| s.id != SENTINEL)
            .collect();
        log::debug!(
            "profile '{}': page {} yielded {} cards",
            profile.name,
            page,
            page_summaries.len()
        );
        summaries.append(&mut page_summaries);
    }
    Ok(summaries)
}

fn listing_url(profile: &Profile, start: u32) -> String {
    format!(
        "{base}/search-results/?keywords={kw}&location={loc}&distance={dist}&start={start}&f_TPR={tpr}",
        base = config::PORTAL_BASE_URL,
        kw = percent_encode_query_value(&profile.keywords),
        loc = percent_encode_query_value(&profile.location),
        dist = profile.distance,
        start = start,
        tpr = percent_encode_query_value(&profile.time_filter),
    )
}

fn detail_url(job_id: &str) -> String {
    format!("{}/jobPosting/{}", config::PORTAL_BASE_URL, job_id)
}

/// Minimal percent-encoding for query values, applied by hand rather than via
/// a general URL builder — a library-driven encoder would re-escape `%`
/// sequences already present in caller-supplied keyword expressions.
fn percent_encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

async fn fetch_details(
    summaries: &[JobSummary],
    client: &Client,
    job_semaphore: &Arc<Semaphore>,
) -> Vec<JobDetail> {
    let fetches = summaries.iter().map(|summary| {
        let id = summary.id.clone();
        let client = client.clone();
        let semaphore = Arc::clone(job_semaphore);
        async move {
            let url = detail_url(&id);
            match fetcher::request_with_backoff(
                &client,
                &url,
                &semaphore,
                config::DEFAULT_MAX_RETRIES,
                config::DEFAULT_BASE_DELAY,
            )
            .await
            {
                Ok(html) => parser::parse_job_detail_page(&html, &id),
                Err(e) => {
                    log::warn!("failed to fetch detail for job {id}: {e}");
                    JobDetail::sentinel(id)
                }
            }
        }
    });
    futures::future::join_all(fetches).await
}

async fn diff_and_record(store: &Store, old: &JobDetail, new: &JobDetail) -> Result<()> {
    for field in config::TRACKED_CHANGE_FIELDS {
        let (old_value, new_value) = match field {
            "salary" => (salary_as_string(old), salary_as_string(new)),
            "number_of_applicants" => {
                (old.number_of_applicants.clone(), new.number_of_applicants.clone())
            }
            "raw_description" => (old.raw_description.clone(), new.raw_description.clone()),
            other => unreachable!("unhandled tracked change field: {other}"),
        };
        if old_value != new_value {
            store
                .record_job_change(&new.id, field, Some(&old_value), Some(&new_value))
                .await?;
        }
    }
    Ok(())
}

fn salary_as_string(detail: &JobDetail) -> String {
    format!(
        "{}-{}",
        detail.salary_min.map(|v| v.to_string()).unwrap_or_default(),
        detail.salary_max.map(|v| v.to_string()).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            id: 1,
            name: "default".into(),
            location: "San Francisco, CA".into(),
            keywords: "AI Engineer OR ML Engineer".into(),
            distance: 25,
            time_filter: "r7200".into(),
            refresh_interval: 7200,
            enabled: true,
            last_scraped_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn listing_url_encodes_spaces_and_keeps_structure() {
        let url = listing_url(&profile(), 10);
        assert!(url.contains("keywords=AI+Engineer+OR+ML+Engineer"));
        assert!(url.contains("location=San+Francisco%2C+CA"));
        assert!(url.contains("distance=25"));
        assert!(url.contains("start=10"));
        assert!(url.contains("f_TPR=r7200"));
    }

    #[test]
    fn detail_url_matches_portal_convention() {
        assert_eq!(
            detail_url("123456"),
            "https://www.linkedin.com/jobs-guest/jobPosting/123456"
        );
    }

    #[tokio::test]
    async fn diff_and_record_writes_one_change_per_changed_tracked_field() {
        let store = crate::repository::Store::open_in_memory().await.unwrap();

        let mut old = JobDetail::sentinel("123");
        old.title = "Engineer".into();
        old.company = "Acme".into();
        old.salary_min = Some(100_000.0);
        old.salary_max = Some(150_000.0);
        old.number_of_applicants = "50".into();
        old.raw_description = "D1".into();
        store.upsert_jobs(&[old.clone()]).await.unwrap();

        let mut new = old.clone();
        new.salary_min = Some(120_000.0);
        new.salary_max = Some(170_000.0);
        new.number_of_applicants = "75".into();

        diff_and_record(&store, &old, &new).await.unwrap();

        let changes = store.get_job_changes(24).await.unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.job_id == "123"));
        assert!(changes.iter().any(|c| c.field_name == "salary"));
        assert!(changes.iter().any(|c| c.field_name == "number_of_applicants"));
    }
}
