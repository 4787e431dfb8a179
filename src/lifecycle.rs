//! Process lifecycle: logging setup plus explicit start/stop of the engine.
//!
//! There is no framework runtime event to hook into here, so shutdown is an
//! explicit method on `Engine` rather than a reaction to a lifecycle event.

use crate::repository::Store;
use crate::scheduler::Scheduler;

/// Initialize the `tracing_subscriber` backend for the `log` facade used
/// throughout the engine, honoring `RUST_LOG` with sane defaults.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sqlx=warn".parse().unwrap())
                .add_directive("jobwatch=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .compact()
        .with_target(false)
        .with_ansi(true)
        .init();
}

/// The running engine: a store handle and the scheduler built on top of it.
pub struct Engine {
    pub store: Store,
    pub scheduler: Scheduler,
}

impl Engine {
    /// Open the database at `db_path`, build the scheduler, and start it.
    pub async fn start(db_path: &std::path::Path) -> anyhow::Result<Self> {
        let store = Store::open(db_path).await?;
        let scheduler = Scheduler::new(store.clone());
        scheduler.start().await?;
        Ok(Self { store, scheduler })
    }

    /// Cancel every worker and the reload loop, then wait for them to finish.
    /// Idempotent.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }
}
