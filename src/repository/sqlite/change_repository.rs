//! Change-log: one row per tracked-field diff detected on re-scrape.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::models::JobChange;

#[derive(Clone)]
pub struct ChangeRepository {
    pool: SqlitePool,
}

impl ChangeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record_job_change(
        &self,
        job_id: &str,
        field_name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_changes (job_id, changed_at, field_name, old_value, new_value)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(job_id)
        .bind(Utc::now().to_rfc3339())
        .bind(field_name)
        .bind(old_value)
        .bind(new_value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to record change for job {job_id}.{field_name}"))?;
        Ok(())
    }

    /// All changes recorded within the last `since_hours`, newest first.
    pub async fn get_job_changes(&self, since_hours: i64) -> Result<Vec<JobChange>> {
        let cutoff = (Utc::now() - chrono::Duration::hours(since_hours)).to_rfc3339();
        let rows = sqlx::query(
            "SELECT * FROM job_changes WHERE changed_at >= ?1 ORDER BY changed_at DESC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .context("get_job_changes")?;
        Ok(rows.into_iter().map(row_to_change).collect())
    }
}

fn row_to_change(row: sqlx::sqlite::SqliteRow) -> JobChange {
    let parse_dt = |s: String| -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    };
    JobChange {
        id: row.get("id"),
        job_id: row.get("job_id"),
        changed_at: parse_dt(row.get("changed_at")),
        field_name: row.get("field_name"),
        old_value: row.try_get("old_value").ok(),
        new_value: row.try_get("new_value").ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use crate::domain::models::JobDetail;
    use crate::repository::sqlite::job_repository::JobRepository;

    #[tokio::test]
    async fn records_and_lists_changes_newest_first() {
        let pool = init_memory_db().await.unwrap();
        JobRepository::new(pool.clone())
            .upsert_jobs(&[JobDetail::sentinel("1")])
            .await
            .unwrap();

        let repo = ChangeRepository::new(pool);
        repo.record_job_change("1", "salary", Some("100000"), Some("110000"))
            .await
            .unwrap();
        repo.record_job_change("1", "number_of_applicants", Some("10"), Some("25"))
            .await
            .unwrap();

        let changes = repo.get_job_changes(24).await.unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field_name, "number_of_applicants");

        // A window that ends before anything was recorded yields nothing.
        let none = repo.get_job_changes(0).await.unwrap();
        assert!(none.is_empty());
    }
}
