//! Job runner service for processing background jobs.
//!
//! ```text
//! JobRunner
//!     │
//!     ├─► Claim a batch (JobQueue::claim)
//!     ├─► Execute the batch concurrently via JobRegistry
//!     └─► Mark succeeded/failed (JobQueue schedules retries)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::queue::{ClaimedJob, FailureOutcome, JobQueue};
use super::registry::{RegistryError, SharedJobRegistry};
use super::ErrorKind;
use crate::config::JobSettings;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone)]
pub struct JobRunnerConfig {
    /// Jobs claimed and executed together per poll
    pub batch_size: i64,
    /// Sleep when no jobs are ready
    pub poll_interval: Duration,
    pub worker_id: String,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            poll_interval: Duration::from_secs(1),
            worker_id: format!("runner-{}", Uuid::new_v4()),
        }
    }
}

impl JobRunnerConfig {
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

impl From<&JobSettings> for JobRunnerConfig {
    fn from(settings: &JobSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            poll_interval: settings.poll_interval,
            ..Default::default()
        }
    }
}

/// Background service that processes jobs from the queue.
pub struct JobRunner {
    job_queue: Arc<dyn JobQueue>,
    registry: SharedJobRegistry,
    deps: Arc<ServerDeps>,
    config: JobRunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new(
        job_queue: Arc<dyn JobQueue>,
        registry: SharedJobRegistry,
        deps: Arc<ServerDeps>,
    ) -> Self {
        Self::with_config(job_queue, registry, deps, JobRunnerConfig::default())
    }

    pub fn with_config(
        job_queue: Arc<dyn JobQueue>,
        registry: SharedJobRegistry,
        deps: Arc<ServerDeps>,
        config: JobRunnerConfig,
    ) -> Self {
        Self {
            job_queue,
            registry,
            deps,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Store `true` into the returned flag to stop the runner after its current batch.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Claim one batch and execute it to completion.
    ///
    /// Returns the number of jobs processed. Tests drive the runner with this.
    pub async fn run_once(&self) -> Result<usize> {
        let jobs = self
            .job_queue
            .claim(&self.config.worker_id, self.config.batch_size)
            .await?;

        if jobs.is_empty() {
            return Ok(0);
        }

        debug!(count = jobs.len(), "claimed jobs");
        let count = jobs.len();
        join_all(jobs.iter().map(|job| self.process(job))).await;
        Ok(count)
    }

    async fn process(&self, job: &ClaimedJob) {
        let job_id = job.id;
        let job_type = job.command_type();
        debug!(job_id = %job_id, job_type = %job_type, attempt = job.job.attempt, "executing job");

        match self.registry.execute(job, self.deps.clone()).await {
            Ok(()) => {
                info!(job_id = %job_id, job_type = %job_type, "job succeeded");
                if let Err(e) = self.job_queue.mark_succeeded(job_id).await {
                    error!(job_id = %job_id, error = %e, "failed to mark job as succeeded");
                }
            }
            Err(e) => {
                warn!(job_id = %job_id, job_type = %job_type, error = %e, "job failed");

                match self
                    .job_queue
                    .mark_failed(job_id, &format!("{:#}", e), classify_error(&e))
                    .await
                {
                    Ok(FailureOutcome::Retrying { next_job_id, run_at }) => {
                        debug!(job_id = %job_id, next_job_id = %next_job_id, run_at = %run_at, "retry scheduled");
                    }
                    Ok(FailureOutcome::DeadLettered) => {
                        error!(job_id = %job_id, job_type = %job_type, error = %e, "job exhausted its retries");
                    }
                    Err(mark_err) => {
                        error!(job_id = %job_id, error = %mark_err, "failed to mark job as failed");
                    }
                }
            }
        }
    }

    /// Run until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "job runner starting"
        );

        while !self.is_shutdown_requested() {
            match self.run_once().await {
                Ok(0) => tokio::time::sleep(self.config.poll_interval).await,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "failed to claim jobs");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!(worker_id = %self.config.worker_id, "job runner stopped");
        Ok(())
    }

    /// Run until Ctrl+C.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }
}

/// Registry failures are permanent; everything a handler raises is retried.
fn classify_error(error: &anyhow::Error) -> ErrorKind {
    if error.downcast_ref::<RegistryError>().is_some() {
        ErrorKind::NonRetryable
    } else {
        ErrorKind::Retryable
    }
}
