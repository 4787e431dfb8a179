//! Error types for the job acquisition engine.
//!
//! - `AppError`: the taxonomy surfaced at component boundaries (store, fetcher, scheduler).
//! - `Result<T>`: type alias for `Result<T, AppError>`.
//!
//! Internal plumbing returns `anyhow::Result` with `.context(...)` annotations; `AppError`
//! is reserved for the boundary a caller might want to match on.

use thiserror::Error;

/// Domain-specific errors for engine operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Transient network failure: timeout, DNS, connection reset.
    #[error("network error: {0}")]
    Network(String),

    /// Upstream returned 429/503 and retries were exhausted.
    #[error("rate limited after {attempts} attempts: {url}")]
    RateLimited { url: String, attempts: u32 },

    /// HTML could not be turned into a usable record (beyond normal sentinel degradation).
    #[error("parse error: {0}")]
    Parse(String),

    /// Store operation failed (query, upsert, schema).
    #[error("database error: {0}")]
    Database(String),

    /// Foreign-key or uniqueness violation; caller contract violation, not retried.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Store could not be opened or schema could not initialize.
    #[error("fatal: store unavailable: {0}")]
    SchemaInit(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Generic error with context, for paths that don't fit a named variant.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
