//! Per-profile worker scheduler: one task per enabled profile, reconciled
//! against the profiles table every 30 s, with graceful shutdown.
//!
//! Cancellation is implemented with `JoinHandle::abort` rather than a
//! cooperative flag: every worker suspension point is either a sleep or an
//! HTTP await, both of which `abort` cleanly unwinds at, so there is no
//! partial-write window to protect against.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config;
use crate::domain::models::Profile;
use crate::fetcher;
use crate::repository::Store;
use crate::scraper_pipeline;

/// Owns the live worker task map plus the two global semaphores. Holding this
/// struct is the only way to reach the scheduler's mutable state; there is no
/// process-global equivalent.
pub struct Scheduler {
    store: Store,
    client: Client,
    job_semaphore: Arc<Semaphore>,
    #[allow(dead_code)] // reserved for future company-enrichment fan-out
    company_semaphore: Arc<Semaphore>,
    workers: Arc<DashMap<i64, JoinHandle<()>>>,
    reload_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    shutting_down: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            client: fetcher::create_client(),
            job_semaphore: Arc::new(Semaphore::new(config::JOB_SEMAPHORE_PERMITS)),
            company_semaphore: Arc::new(Semaphore::new(config::COMPANY_SEMAPHORE_PERMITS)),
            workers: Arc::new(DashMap::new()),
            reload_handle: std::sync::Mutex::new(None),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Seed the default profile if the store is empty, spawn a worker for
    /// every enabled profile, then start the reload loop.
    pub async fn start(&self) -> anyhow::Result<()> {
        self.store.seed_default_profile().await?;

        for profile in self.store.list_profiles().await? {
            if profile.enabled {
                self.spawn_worker(profile);
            }
        }

        let store = self.store.clone();
        let client = self.client.clone();
        let job_semaphore = Arc::clone(&self.job_semaphore);
        let workers = Arc::clone(&self.workers);
        let shutting_down = Arc::clone(&self.shutting_down);

        let handle = tokio::spawn(async move {
            reload_loop(store, client, job_semaphore, workers, shutting_down).await;
        });
        *self.reload_handle.lock().expect("reload handle mutex poisoned") = Some(handle);

        Ok(())
    }

    /// Spawn a worker for `profile`. A duplicate spawn for an already-running
    /// id is a no-op that logs a warning; the existing task is preserved.
    pub fn spawn_worker(&self, profile: Profile) {
        if self.workers.contains_key(&profile.id) {
            log::warn!("spawn_worker: profile {} already has a running worker", profile.id);
            return;
        }

        let store = self.store.clone();
        let client = self.client.clone();
        let job_semaphore = Arc::clone(&self.job_semaphore);
        let profile_id = profile.id;

        let handle = tokio::spawn(async move {
            worker_loop(profile_id, store, client, job_semaphore).await;
        });
        self.workers.insert(profile_id, handle);
        log::info!("spawned worker for profile {profile_id}");
    }

    /// Cancel the worker for `profile_id`, await its termination (a
    /// cancellation error is expected and swallowed), and forget it.
    pub async fn kill_worker(&self, profile_id: i64) {
        kill_worker_in(&self.workers, profile_id).await;
    }

    /// Run one reload-loop reconciliation immediately, rather than waiting
    /// for the next periodic tick. Exposed for deterministic testing.
    pub async fn reconcile_once(&self) -> anyhow::Result<()> {
        reconcile(&self.store, &self.client, &self.job_semaphore, &self.workers).await
    }

    /// Number of workers currently tracked as running.
    pub fn running_worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Set the shutdown signal, cancel every worker and the reload loop, and
    /// wait for all of them to finish. Idempotent.
    pub async fn stop(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("scheduler shutting down");

        let ids: Vec<i64> = self.workers.iter().map(|e| *e.key()).collect();
        for id in ids {
            self.kill_worker(id).await;
        }

        let reload_handle = self.reload_handle.lock().expect("reload handle mutex poisoned").take();
        if let Some(handle) = reload_handle {
            handle.abort();
            let _ = handle.await;
        }
        log::info!("scheduler shutdown complete");
    }
}

async fn kill_worker_in(workers: &Arc<DashMap<i64, JoinHandle<()>>>, profile_id: i64) {
    if let Some((_, handle)) = workers.remove(&profile_id) {
        handle.abort();
        let _ = handle.await;
        log::info!("killed worker for profile {profile_id}");
    }
}

async fn worker_loop(profile_id: i64, store: Store, client: Client, job_semaphore: Arc<Semaphore>) {
    loop {
        let profile = match store.get_profile(profile_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                log::warn!("worker for profile {profile_id}: profile no longer exists, stopping");
                return;
            }
            Err(e) => {
                log::error!("worker for profile {profile_id}: failed to reload profile: {e}");
                sleep(Duration::from_secs(config::WORKER_ERROR_BACKOFF_CAP_SECS)).await;
                continue;
            }
        };

        match scraper_pipeline::scrape_once(&profile, &store, &client, &job_semaphore).await {
            Ok(n) => {
                log::info!("profile '{}': cycle upserted {n} jobs", profile.name);
                if let Err(e) = store.update_profile_last_run(profile_id, Utc::now()).await {
                    log::error!("profile '{}': failed to record last run: {e}", profile.name);
                }
                sleep(Duration::from_secs(profile.refresh_interval.max(0) as u64)).await;
            }
            Err(e) => {
                log::warn!("profile '{}': cycle failed: {e}", profile.name);
                let backoff = profile
                    .refresh_interval
                    .min(config::WORKER_ERROR_BACKOFF_CAP_SECS as i64)
                    .max(0) as u64;
                sleep(Duration::from_secs(backoff)).await;
            }
        }
    }
}

async fn reload_loop(
    store: Store,
    client: Client,
    job_semaphore: Arc<Semaphore>,
    workers: Arc<DashMap<i64, JoinHandle<()>>>,
    shutting_down: Arc<AtomicBool>,
) {
    loop {
        sleep(config::RELOAD_LOOP_PERIOD).await;
        if shutting_down.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = reconcile(&store, &client, &job_semaphore, &workers).await {
            log::error!("reload loop iteration failed: {e}");
        }
    }
}

async fn reconcile(
    store: &Store,
    client: &Client,
    job_semaphore: &Arc<Semaphore>,
    workers: &Arc<DashMap<i64, JoinHandle<()>>>,
) -> anyhow::Result<()> {
    let profiles = store.list_profiles().await?;
    let all_ids: HashSet<i64> = profiles.iter().map(|p| p.id).collect();
    let enabled_ids: HashSet<i64> = profiles.iter().filter(|p| p.enabled).map(|p| p.id).collect();
    let running_ids: HashSet<i64> = workers.iter().map(|e| *e.key()).collect();

    for profile in &profiles {
        if profile.enabled && !running_ids.contains(&profile.id) {
            let store = store.clone();
            let client = client.clone();
            let job_semaphore = Arc::clone(job_semaphore);
            let profile_id = profile.id;
            let handle = tokio::spawn(async move {
                worker_loop(profile_id, store, client, job_semaphore).await;
            });
            workers.insert(profile_id, handle);
            log::info!("reload loop: spawned worker for profile {profile_id}");
        }
    }

    for id in running_ids {
        let should_kill = !all_ids.contains(&id) || !enabled_ids.contains(&id);
        if should_kill {
            kill_worker_in(workers, id).await;
            log::info!("reload loop: killed worker for profile {id}");
        }
    }

    Ok(())
}
