//! Application-tracking: marking a job applied, moving it through the status
//! pipeline, and listing tracked applications.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::domain::models::{Application, ApplicationStatus, ApplicationView};

#[derive(Clone)]
pub struct ApplicationRepository {
    pool: SqlitePool,
}

impl ApplicationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn mark_job_applied(&self, job_id: &str, notes: Option<&str>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO applications (job_id, applied_at, status, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?2, ?2)
            ON CONFLICT(job_id) DO UPDATE SET
                applied_at = excluded.applied_at,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(job_id)
        .bind(&now)
        .bind(ApplicationStatus::Applied.as_str())
        .bind(notes)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to mark job {job_id} applied"))?;
        Ok(())
    }

    pub async fn update_application_status(
        &self,
        job_id: &str,
        status: ApplicationStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE applications SET status = ?1, updated_at = ?2 WHERE job_id = ?3",
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(job_id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update status for job {job_id}"))?;

        if result.rows_affected() == 0 {
            anyhow::bail!("cannot set status on job {job_id}: no application on file");
        }
        Ok(())
    }

    /// Applications joined with their job's title/company/location, newest
    /// first. `status` narrows to a single application status when present.
    pub async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationView>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT a.*, j.title AS job_title, j.company AS job_company, j.location AS job_location
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            "#,
        );
        if let Some(status) = status {
            qb.push(" WHERE a.status = ");
            qb.push_bind(status.as_str().to_string());
        }
        qb.push(" ORDER BY a.applied_at DESC");

        let rows = qb.build().fetch_all(&self.pool).await.context("list_applications")?;
        rows.into_iter().map(row_to_application_view).collect()
    }
}

fn row_to_application_view(row: sqlx::sqlite::SqliteRow) -> Result<ApplicationView> {
    let parse_dt = |s: String| -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    };
    let status: String = row.get("status");
    let application = Application {
        job_id: row.get("job_id"),
        applied_at: parse_dt(row.get("applied_at")),
        status: status.parse()?,
        notes: row.try_get("notes").ok(),
        created_at: parse_dt(row.get("created_at")),
        updated_at: parse_dt(row.get("updated_at")),
    };
    Ok(ApplicationView {
        application,
        job_title: row.get("job_title"),
        job_company: row.get("job_company"),
        job_location: row.get("job_location"),
    })
}
