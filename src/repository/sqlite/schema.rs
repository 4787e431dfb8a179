//! Idempotent DDL. Every statement uses `IF NOT EXISTS`; re-running is a no-op.
//!
//! `jobs_fts` is an external-content FTS5 index over `jobs` (content_rowid is
//! the table's implicit `rowid`, since `jobs` has a TEXT primary key). The
//! sync triggers must use the `('delete', ...)` command on update/delete —
//! an ordinary row delete against the shadow table desynchronizes the index.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        location TEXT NOT NULL,
        keywords TEXT NOT NULL,
        distance INTEGER NOT NULL,
        time_filter TEXT NOT NULL,
        refresh_interval INTEGER NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        last_scraped_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        company TEXT NOT NULL,
        normalized_company_name TEXT NOT NULL,
        location TEXT NOT NULL,
        posted_date TEXT NOT NULL,
        posted_date_iso TEXT NOT NULL,
        url TEXT NOT NULL,
        company_url TEXT NOT NULL,
        salary_min REAL,
        salary_max REAL,
        salary_currency TEXT NOT NULL DEFAULT 'USD',
        equity_offered INTEGER NOT NULL DEFAULT 0,
        remote_eligible INTEGER NOT NULL DEFAULT 0,
        visa_sponsorship INTEGER NOT NULL DEFAULT 0,
        skills TEXT NOT NULL DEFAULT '[]',
        easy_apply INTEGER NOT NULL DEFAULT 0,
        raw_description TEXT NOT NULL DEFAULT '',
        employment_type TEXT NOT NULL DEFAULT 'N/A',
        seniority_level TEXT NOT NULL DEFAULT 'N/A',
        job_function TEXT NOT NULL DEFAULT 'N/A',
        industries TEXT NOT NULL DEFAULT 'N/A',
        number_of_applicants TEXT NOT NULL DEFAULT 'N/A',
        benefits_badge TEXT NOT NULL DEFAULT 'N/A',
        profile_id INTEGER REFERENCES profiles(id) ON DELETE SET NULL,
        scraped_at TEXT NOT NULL,
        last_seen TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS applications (
        job_id TEXT PRIMARY KEY REFERENCES jobs(id) ON DELETE CASCADE,
        applied_at TEXT NOT NULL,
        status TEXT NOT NULL,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS company_enrichment (
        normalized_company_name TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        size TEXT,
        industry TEXT,
        description TEXT,
        website TEXT,
        headquarters TEXT,
        founded_year INTEGER,
        specialties TEXT NOT NULL DEFAULT '[]',
        profile_url TEXT,
        scraped_at TEXT NOT NULL,
        next_refresh_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_changes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        changed_at TEXT NOT NULL,
        field_name TEXT NOT NULL,
        old_value TEXT,
        new_value TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(normalized_company_name)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_location ON jobs(location)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_posted_date_iso ON jobs(posted_date_iso DESC)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_scraped_at ON jobs(scraped_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_profile_id ON jobs(profile_id)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_remote ON jobs(remote_eligible) WHERE remote_eligible = 1",
    "CREATE INDEX IF NOT EXISTS idx_jobs_visa ON jobs(visa_sponsorship) WHERE visa_sponsorship = 1",
    "CREATE INDEX IF NOT EXISTS idx_applications_job_id ON applications(job_id)",
    "CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status)",
    "CREATE INDEX IF NOT EXISTS idx_company_enrichment_name ON company_enrichment(normalized_company_name)",
    "CREATE INDEX IF NOT EXISTS idx_company_enrichment_refresh ON company_enrichment(next_refresh_at)",
    r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS jobs_fts USING fts5(
        title, company, location, raw_description,
        content='jobs', content_rowid='rowid'
    )
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS jobs_fts_ai AFTER INSERT ON jobs BEGIN
        INSERT INTO jobs_fts(rowid, title, company, location, raw_description)
        VALUES (new.rowid, new.title, new.company, new.location, new.raw_description);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS jobs_fts_ad AFTER DELETE ON jobs BEGIN
        INSERT INTO jobs_fts(jobs_fts, rowid, title, company, location, raw_description)
        VALUES ('delete', old.rowid, old.title, old.company, old.location, old.raw_description);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS jobs_fts_au AFTER UPDATE ON jobs BEGIN
        INSERT INTO jobs_fts(jobs_fts, rowid, title, company, location, raw_description)
        VALUES ('delete', old.rowid, old.title, old.company, old.location, old.raw_description);
        INSERT INTO jobs_fts(rowid, title, company, location, raw_description)
        VALUES (new.rowid, new.title, new.company, new.location, new.raw_description);
    END
    "#,
];

/// Create every table, index, and FTS trigger if absent. Safe to call on
/// every startup.
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    for stmt in STATEMENTS {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .with_context(|| format!("failed executing schema statement: {stmt}"))?;
    }
    Ok(())
}

/// Maintenance operation: rebuild `jobs_fts` from scratch against the current
/// contents of `jobs`. Required after any bulk rewrite that could have
/// bypassed the sync triggers.
pub async fn rebuild_fts(pool: &SqlitePool) -> Result<()> {
    sqlx::query("INSERT INTO jobs_fts(jobs_fts) VALUES ('rebuild')")
        .execute(pool)
        .await
        .context("failed to rebuild FTS index")?;
    Ok(())
}
