//! SQLite-backed repository implementations, one module per entity.

pub mod analytics;
pub mod application_repository;
pub mod change_repository;
pub mod enrichment_repository;
pub mod job_repository;
pub mod profile_repository;
pub mod schema;

pub use analytics::{get_cache_analytics, CacheAnalytics};
pub use application_repository::ApplicationRepository;
pub use change_repository::ChangeRepository;
pub use enrichment_repository::EnrichmentRepository;
pub use job_repository::JobRepository;
pub use profile_repository::ProfileRepository;
pub use schema::{initialize_schema, rebuild_fts};
