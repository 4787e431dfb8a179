//! Cache-wide analytics aggregate, assembled from several cheap queries
//! rather than one monolithic join.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobAgeBuckets {
    pub under_24h: i64,
    pub under_7d: i64,
    pub under_30d: i64,
    pub older: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub next_scrape_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheAnalytics {
    pub job_age_buckets: JobAgeBuckets,
    pub counts_by_application_status: Vec<(String, i64)>,
    pub top_companies: Vec<(String, i64)>,
    pub top_locations: Vec<(String, i64)>,
    pub profiles: Vec<ProfileSummary>,
    pub company_enrichment_count: i64,
    pub company_enrichment_refresh_backlog: i64,
    pub on_disk_size_mb: f64,
    pub oldest_scraped_at: Option<DateTime<Utc>>,
    pub newest_scraped_at: Option<DateTime<Utc>>,
}

pub async fn get_cache_analytics(pool: &SqlitePool, db_path: Option<&std::path::Path>) -> Result<CacheAnalytics> {
    let now = Utc::now();

    let job_age_buckets = job_age_buckets(pool, now).await?;
    let counts_by_application_status = counts_by_application_status(pool).await?;
    let top_companies = top_n(pool, "normalized_company_name").await?;
    let top_locations = top_n(pool, "location").await?;
    let profiles = profile_summaries(pool).await?;
    let (company_enrichment_count, company_enrichment_refresh_backlog) =
        enrichment_counts(pool, now).await?;
    let (oldest_scraped_at, newest_scraped_at) = scraped_at_bounds(pool).await?;
    let on_disk_size_mb = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|meta| meta.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0);

    Ok(CacheAnalytics {
        job_age_buckets,
        counts_by_application_status,
        top_companies,
        top_locations,
        profiles,
        company_enrichment_count,
        company_enrichment_refresh_backlog,
        on_disk_size_mb,
        oldest_scraped_at,
        newest_scraped_at,
    })
}

async fn job_age_buckets(pool: &SqlitePool, now: DateTime<Utc>) -> Result<JobAgeBuckets> {
    let day1 = (now - chrono::Duration::hours(24)).to_rfc3339();
    let day7 = (now - chrono::Duration::days(7)).to_rfc3339();
    let day30 = (now - chrono::Duration::days(30)).to_rfc3339();

    let row = sqlx::query(
        r#"
        SELECT
            SUM(CASE WHEN scraped_at >= ?1 THEN 1 ELSE 0 END) AS under_24h,
            SUM(CASE WHEN scraped_at >= ?2 AND scraped_at < ?1 THEN 1 ELSE 0 END) AS under_7d,
            SUM(CASE WHEN scraped_at >= ?3 AND scraped_at < ?2 THEN 1 ELSE 0 END) AS under_30d,
            SUM(CASE WHEN scraped_at < ?3 THEN 1 ELSE 0 END) AS older
        FROM jobs
        "#,
    )
    .bind(&day1)
    .bind(&day7)
    .bind(&day30)
    .fetch_one(pool)
    .await
    .context("job_age_buckets")?;

    Ok(JobAgeBuckets {
        under_24h: row.try_get::<i64, _>("under_24h").unwrap_or(0),
        under_7d: row.try_get::<i64, _>("under_7d").unwrap_or(0),
        under_30d: row.try_get::<i64, _>("under_30d").unwrap_or(0),
        older: row.try_get::<i64, _>("older").unwrap_or(0),
    })
}

async fn counts_by_application_status(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT COALESCE(a.status, 'not_applied') AS status, COUNT(*) AS n
        FROM jobs j
        LEFT JOIN applications a ON a.job_id = j.id
        GROUP BY status
        ORDER BY n DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("counts_by_application_status")?;
    Ok(rows
        .into_iter()
        .map(|r| (r.get("status"), r.get("n")))
        .collect())
}

async fn top_n(pool: &SqlitePool, column: &str) -> Result<Vec<(String, i64)>> {
    let sql = format!(
        "SELECT {column} AS key, COUNT(*) AS n FROM jobs GROUP BY {column} ORDER BY n DESC LIMIT 10"
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await.context("top_n")?;
    Ok(rows.into_iter().map(|r| (r.get("key"), r.get("n"))).collect())
}

async fn profile_summaries(pool: &SqlitePool) -> Result<Vec<ProfileSummary>> {
    let rows = sqlx::query("SELECT * FROM profiles ORDER BY id")
        .fetch_all(pool)
        .await
        .context("profile_summaries")?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let last_scraped_at: Option<DateTime<Utc>> = row
                .try_get::<Option<String>, _>("last_scraped_at")
                .ok()
                .flatten()
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let refresh_interval: i64 = row.get("refresh_interval");
            let next_scrape_at =
                last_scraped_at.map(|t| t + chrono::Duration::seconds(refresh_interval));

            ProfileSummary {
                id: row.get("id"),
                name: row.get("name"),
                enabled: row.get("enabled"),
                last_scraped_at,
                next_scrape_at,
            }
        })
        .collect())
}

async fn enrichment_counts(pool: &SqlitePool, now: DateTime<Utc>) -> Result<(i64, i64)> {
    let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM company_enrichment")
        .fetch_one(pool)
        .await
        .context("enrichment total")?
        .get("n");
    let backlog: i64 = sqlx::query("SELECT COUNT(*) AS n FROM company_enrichment WHERE next_refresh_at < ?1")
        .bind(now.to_rfc3339())
        .fetch_one(pool)
        .await
        .context("enrichment backlog")?
        .get("n");
    Ok((total, backlog))
}

async fn scraped_at_bounds(
    pool: &SqlitePool,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let row = sqlx::query("SELECT MIN(scraped_at) AS oldest, MAX(scraped_at) AS newest FROM jobs")
        .fetch_one(pool)
        .await
        .context("scraped_at_bounds")?;
    let parse = |s: Option<String>| {
        s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };
    Ok((
        parse(row.try_get("oldest").ok().flatten()),
        parse(row.try_get("newest").ok().flatten()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use crate::domain::models::JobDetail;
    use crate::repository::sqlite::job_repository::JobRepository;
    use crate::repository::sqlite::profile_repository::ProfileRepository;

    #[tokio::test]
    async fn analytics_reflects_seeded_data() {
        let pool = init_memory_db().await.unwrap();
        ProfileRepository::new(pool.clone()).seed_default_profile().await.unwrap();
        JobRepository::new(pool.clone())
            .upsert_jobs(&[JobDetail::sentinel("1"), JobDetail::sentinel("2")])
            .await
            .unwrap();

        let analytics = get_cache_analytics(&pool, None).await.unwrap();
        assert_eq!(analytics.job_age_buckets.under_24h, 2);
        assert_eq!(analytics.profiles.len(), 1);
        assert_eq!(analytics.profiles[0].next_scrape_at, None);
    }
}
