//! Ingestion jobs: identity, asynchronous execution and status tracking.
//!
//! A job is submitted for an (account, group reference) pair, runs on its own tokio task
//! and reports progress through an in-memory table that status callers read without
//! blocking the ingestion. Finished entries are swept after a TTL.

mod runner;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, warn};

use crate::core::accounts::AccountService;
use crate::core::directory::DirectoryConnector;
use crate::core::ingest::IngestError;
use crate::core::lifecycle::LifecycleComponent;
use crate::core::storage::Storage;

use types::{JobProgress, JobSnapshot};

/// Cron expression for the finished-job sweep (every minute, at second 0).
const SWEEP_SCHEDULE: &str = "0 * * * * *";

#[derive(Clone)]
pub struct JobOrchestrator {
    storage: Arc<Storage>,
    accounts: AccountService,
    connector: Arc<dyn DirectoryConnector>,
    jobs: Arc<RwLock<HashMap<String, Arc<JobProgress>>>>,
    ttl: Duration,
}

fn new_job_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

impl JobOrchestrator {
    pub fn new(
        storage: Arc<Storage>,
        accounts: AccountService,
        connector: Arc<dyn DirectoryConnector>,
        ttl: Duration,
    ) -> Self {
        Self {
            storage,
            accounts,
            connector,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Validates the account, registers the job as `init` and launches it.
    ///
    /// Returns as soon as the job is queryable; the caller never waits for ingestion.
    pub async fn submit(&self, account_id: i64, reference: &str) -> Result<String, IngestError> {
        let credentials = self
            .accounts
            .credentials(account_id)
            .await
            .map_err(IngestError::Persistence)?
            .ok_or(IngestError::AccountNotReady(account_id))?;

        let reference = reference.trim();
        let progress = Arc::new(JobProgress::new(account_id, reference));
        let job_id = {
            let mut jobs = self.jobs.write().await;
            let mut job_id = new_job_id();
            while jobs.contains_key(&job_id) {
                job_id = new_job_id();
            }
            jobs.insert(job_id.clone(), progress.clone());
            job_id
        };

        info!(
            "[job {}] submitted: account {} group '{}'",
            job_id, account_id, reference
        );
        tokio::spawn(runner::run_job(runner::JobContext {
            job_id: job_id.clone(),
            progress,
            credentials,
            connector: self.connector.clone(),
            storage: self.storage.clone(),
        }));

        Ok(job_id)
    }

    /// Pure read. Unknown or evicted ids report `unknown` with a zero count.
    pub async fn status(&self, job_id: &str) -> JobSnapshot {
        let jobs = self.jobs.read().await;
        match jobs.get(job_id) {
            Some(progress) => progress.snapshot(job_id),
            None => JobSnapshot::unknown(job_id),
        }
    }

    /// Every job still in the table, newest first.
    pub async fn list(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.read().await;
        let mut entries: Vec<(&String, &Arc<JobProgress>)> = jobs.iter().collect();
        entries.sort_by_key(|(_, p)| std::cmp::Reverse(p.submitted_at()));
        entries
            .into_iter()
            .map(|(id, progress)| progress.snapshot(id))
            .collect()
    }

    pub async fn active_count(&self) -> usize {
        let jobs = self.jobs.read().await;
        jobs.values().filter(|p| !p.status().is_terminal()).count()
    }

    /// Drops jobs that have been terminal for longer than the TTL. Returns how many went.
    pub async fn evict_finished(&self) -> usize {
        let now = Instant::now();
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, progress| !progress.expired(self.ttl, now));
        before - jobs.len()
    }

    /// Registers the periodic TTL sweep on the lifecycle scheduler.
    pub async fn register_sweeper(&self, scheduler: &JobScheduler) -> Result<()> {
        let orchestrator = self.clone();
        let job = Job::new_async(SWEEP_SCHEDULE, move |_uuid, mut _l| {
            let orchestrator = orchestrator.clone();
            Box::pin(async move {
                let evicted = orchestrator.evict_finished().await;
                if evicted > 0 {
                    debug!("Evicted {} finished job(s)", evicted);
                }
            })
        })?;
        scheduler.add(job).await?;
        Ok(())
    }
}

#[async_trait]
impl LifecycleComponent for JobOrchestrator {
    async fn on_init(&mut self) -> Result<()> {
        info!(
            "Job orchestrator initializing (finished jobs kept for {}s)...",
            self.ttl.as_secs()
        );
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let (accounts, members) = self.storage.stats().await?;
        info!(
            "Job orchestrator ready: {} account(s), {} stored membership row(s)",
            accounts, members
        );
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        let active = self.active_count().await;
        if active > 0 {
            warn!(
                "Shutting down with {} job(s) still running; their progress is lost",
                active
            );
        } else {
            info!("Job orchestrator shutting down...");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
