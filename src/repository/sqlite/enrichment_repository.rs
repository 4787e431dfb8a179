//! Company enrichment cache: upsert, point lookup, and staleness scan.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::config::COMPANY_REFRESH_WINDOW_DAYS;
use crate::domain::models::CompanyEnrichment;

#[derive(Clone)]
pub struct EnrichmentRepository {
    pool: SqlitePool,
}

impl EnrichmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert_company_enrichment(&self, record: &CompanyEnrichment) -> Result<()> {
        let specialties_json =
            serde_json::to_string(&record.specialties).unwrap_or_else(|_| "[]".into());
        sqlx::query(
            r#"
            INSERT INTO company_enrichment (
                normalized_company_name, display_name, size, industry, description,
                website, headquarters, founded_year, specialties, profile_url,
                scraped_at, next_refresh_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(normalized_company_name) DO UPDATE SET
                display_name = excluded.display_name,
                size = excluded.size,
                industry = excluded.industry,
                description = excluded.description,
                website = excluded.website,
                headquarters = excluded.headquarters,
                founded_year = excluded.founded_year,
                specialties = excluded.specialties,
                profile_url = excluded.profile_url,
                scraped_at = excluded.scraped_at,
                next_refresh_at = excluded.next_refresh_at
            "#,
        )
        .bind(&record.normalized_company_name)
        .bind(&record.display_name)
        .bind(&record.size)
        .bind(&record.industry)
        .bind(&record.description)
        .bind(&record.website)
        .bind(&record.headquarters)
        .bind(record.founded_year)
        .bind(&specialties_json)
        .bind(&record.profile_url)
        .bind(record.scraped_at.to_rfc3339())
        .bind(record.next_refresh_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert enrichment for {}", record.normalized_company_name))?;
        Ok(())
    }

    pub async fn get_company_enrichment(
        &self,
        normalized_company_name: &str,
    ) -> Result<Option<CompanyEnrichment>> {
        let row = sqlx::query("SELECT * FROM company_enrichment WHERE normalized_company_name = ?1")
            .bind(normalized_company_name)
            .fetch_optional(&self.pool)
            .await
            .context("get_company_enrichment")?;
        row.map(row_to_enrichment).transpose()
    }

    /// Companies with at least one job on file whose enrichment is missing or
    /// past `next_refresh_at`, ordered oldest-first.
    pub async fn get_companies_needing_refresh(&self, limit: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT j.normalized_company_name AS name
            FROM jobs j
            LEFT JOIN company_enrichment ce ON ce.normalized_company_name = j.normalized_company_name
            WHERE ce.normalized_company_name IS NULL OR ce.next_refresh_at < ?1
            ORDER BY ce.next_refresh_at ASC
            LIMIT ?2
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("get_companies_needing_refresh")?;
        Ok(rows.into_iter().map(|r| r.get("name")).collect())
    }
}

/// Default `next_refresh_at` for a freshly scraped company.
pub fn default_next_refresh(now: DateTime<Utc>) -> DateTime<Utc> {
    now + chrono::Duration::days(COMPANY_REFRESH_WINDOW_DAYS)
}

fn row_to_enrichment(row: sqlx::sqlite::SqliteRow) -> Result<CompanyEnrichment> {
    let parse_dt = |s: String| -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    };
    let specialties: Vec<String> = row
        .try_get::<String, _>("specialties")
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();

    Ok(CompanyEnrichment {
        normalized_company_name: row.get("normalized_company_name"),
        display_name: row.get("display_name"),
        size: row.try_get("size").ok(),
        industry: row.try_get("industry").ok(),
        description: row.try_get("description").ok(),
        website: row.try_get("website").ok(),
        headquarters: row.try_get("headquarters").ok(),
        founded_year: row.try_get("founded_year").ok(),
        specialties,
        profile_url: row.try_get("profile_url").ok(),
        scraped_at: parse_dt(row.get("scraped_at")),
        next_refresh_at: parse_dt(row.get("next_refresh_at")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use crate::domain::models::JobDetail;
    use crate::repository::sqlite::job_repository::JobRepository;

    fn sample(name: &str) -> CompanyEnrichment {
        let now = Utc::now();
        CompanyEnrichment {
            normalized_company_name: name.to_string(),
            display_name: "Acme Corp".into(),
            size: Some("201-500".into()),
            industry: Some("Software".into()),
            description: None,
            website: None,
            headquarters: None,
            founded_year: Some(2010),
            specialties: vec!["AI".into(), "Infra".into()],
            profile_url: None,
            scraped_at: now,
            next_refresh_at: default_next_refresh(now),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_roundtrips() {
        let pool = init_memory_db().await.unwrap();
        let repo = EnrichmentRepository::new(pool);
        repo.upsert_company_enrichment(&sample("acme")).await.unwrap();
        let got = repo.get_company_enrichment("acme").await.unwrap().unwrap();
        assert_eq!(got.display_name, "Acme Corp");
        assert_eq!(got.specialties, vec!["AI".to_string(), "Infra".to_string()]);
    }

    #[tokio::test]
    async fn companies_needing_refresh_includes_unenriched_job_companies() {
        let pool = init_memory_db().await.unwrap();
        let mut job = JobDetail::sentinel("1");
        job.normalized_company_name = "newco".into();
        JobRepository::new(pool.clone()).upsert_jobs(&[job]).await.unwrap();

        let repo = EnrichmentRepository::new(pool);
        let stale = repo.get_companies_needing_refresh(10).await.unwrap();
        assert!(stale.contains(&"newco".to_string()));
    }
}
