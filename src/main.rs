//! Minimal binary entry point: wires up logging, opens the store at its
//! default path, starts the scheduler, and blocks until told to shut down.
//! The RPC surface that would sit in front of this is out of scope here.

use jobwatch::{db, lifecycle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lifecycle::init_logging();

    let db_path = db::default_db_path()?;
    let engine = lifecycle::Engine::start(&db_path).await?;

    tokio::signal::ctrl_c().await?;
    log::info!("received shutdown signal");
    engine.stop().await;

    Ok(())
}
