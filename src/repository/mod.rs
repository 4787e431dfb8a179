//! Store facade: a single persistence handle composed from one repository per
//! entity, so the scraper pipeline and scheduler don't have to juggle pools.

pub mod sqlite;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db;
use crate::domain::models::{
    ApplicationStatus, ApplicationView, CompanyEnrichment, JobChange, JobDetail, JobFilters,
    JobView, NewProfile, Profile, SortBy,
};
use crate::repository::sqlite::analytics::CacheAnalytics;
use crate::repository::sqlite::{
    ApplicationRepository, ChangeRepository, EnrichmentRepository, JobRepository,
    ProfileRepository,
};

/// Owns the connection pool and delegates to per-entity repositories.
/// Cheap to clone: `sqlx::SqlitePool` is itself a handle around a shared pool.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    db_path: Option<PathBuf>,
    jobs: JobRepository,
    profiles: ProfileRepository,
    applications: ApplicationRepository,
    enrichment: EnrichmentRepository,
    changes: ChangeRepository,
}

impl Store {
    pub async fn open(db_path: &std::path::Path) -> Result<Self> {
        let pool = db::init_db(db_path).await?;
        Ok(Self::from_pool(pool, Some(db_path.to_path_buf())))
    }

    pub async fn open_in_memory() -> Result<Self> {
        let pool = db::init_memory_db().await?;
        Ok(Self::from_pool(pool, None))
    }

    fn from_pool(pool: SqlitePool, db_path: Option<PathBuf>) -> Self {
        Self {
            jobs: JobRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            applications: ApplicationRepository::new(pool.clone()),
            enrichment: EnrichmentRepository::new(pool.clone()),
            changes: ChangeRepository::new(pool.clone()),
            pool,
            db_path,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- jobs ----

    pub async fn upsert_jobs(&self, records: &[JobDetail]) -> Result<u64> {
        self.jobs.upsert_jobs(records).await
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobView>> {
        self.jobs.get_job(job_id).await
    }

    pub async fn query_jobs(
        &self,
        filters: &JobFilters,
        limit: i64,
        offset: i64,
        sort_by: SortBy,
    ) -> Result<Vec<JobView>> {
        self.jobs.query_jobs(filters, limit, offset, sort_by).await
    }

    pub async fn count_jobs(&self, filters: &JobFilters) -> Result<i64> {
        self.jobs.count_jobs(filters).await
    }

    pub async fn delete_old_jobs(&self, max_age_seconds: i64) -> Result<u64> {
        self.jobs.delete_old_jobs(max_age_seconds).await
    }

    // ---- profiles ----

    pub async fn upsert_profile(&self, new: &NewProfile) -> Result<Profile> {
        self.profiles.upsert_profile(new).await
    }

    pub async fn get_profile(&self, id: i64) -> Result<Option<Profile>> {
        self.profiles.get_profile(id).await
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.profiles.list_profiles().await
    }

    pub async fn delete_profile(&self, id: i64, hard: bool) -> Result<()> {
        self.profiles.delete_profile(id, hard).await
    }

    pub async fn update_profile_last_run(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        self.profiles.update_profile_last_run(id, at).await
    }

    pub async fn seed_default_profile(&self) -> Result<()> {
        self.profiles.seed_default_profile().await
    }

    // ---- applications ----

    pub async fn mark_job_applied(&self, job_id: &str, notes: Option<&str>) -> Result<()> {
        self.applications.mark_job_applied(job_id, notes).await
    }

    pub async fn update_application_status(
        &self,
        job_id: &str,
        status: ApplicationStatus,
    ) -> Result<()> {
        self.applications.update_application_status(job_id, status).await
    }

    pub async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationView>> {
        self.applications.list_applications(status).await
    }

    // ---- company enrichment ----

    pub async fn upsert_company_enrichment(&self, record: &CompanyEnrichment) -> Result<()> {
        self.enrichment.upsert_company_enrichment(record).await
    }

    pub async fn get_company_enrichment(
        &self,
        normalized_company_name: &str,
    ) -> Result<Option<CompanyEnrichment>> {
        self.enrichment.get_company_enrichment(normalized_company_name).await
    }

    pub async fn get_companies_needing_refresh(&self, limit: i64) -> Result<Vec<String>> {
        self.enrichment.get_companies_needing_refresh(limit).await
    }

    // ---- change log ----

    pub async fn record_job_change(
        &self,
        job_id: &str,
        field_name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()> {
        self.changes
            .record_job_change(job_id, field_name, old_value, new_value)
            .await
    }

    pub async fn get_job_changes(&self, since_hours: i64) -> Result<Vec<JobChange>> {
        self.changes.get_job_changes(since_hours).await
    }

    // ---- maintenance / analytics ----

    pub async fn rebuild_fts(&self) -> Result<()> {
        sqlite::rebuild_fts(&self.pool).await
    }

    pub async fn get_cache_analytics(&self) -> Result<CacheAnalytics> {
        sqlite::get_cache_analytics(&self.pool, self.db_path.as_deref()).await
    }
}
