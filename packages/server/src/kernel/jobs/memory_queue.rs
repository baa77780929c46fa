//! In-memory job queue with the same retry semantics as [`PostgresJobQueue`].
//!
//! Useful for tests and local development. Jobs are lost on restart.
//!
//! [`PostgresJobQueue`]: super::PostgresJobQueue

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::job::{ErrorKind, Job, JobStatus};
use super::queue::{ClaimedJob, EnqueueResult, FailureOutcome, JobQueue, JobSpec, RetryPolicy};

pub struct MemoryJobQueue {
    jobs: Mutex<Vec<Job>>,
    policy: RetryPolicy,
    lease: Duration,
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl MemoryJobQueue {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            policy,
            lease: Duration::minutes(5),
        }
    }

    /// Snapshot of every job ever enqueued, in insertion order.
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }

    /// Jobs of one type, in insertion order.
    pub fn jobs_of_type(&self, job_type: &str) -> Vec<Job> {
        self.jobs()
            .into_iter()
            .filter(|j| j.job_type == job_type)
            .collect()
    }

    /// Number of pending or running jobs.
    pub fn outstanding(&self) -> usize {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| matches!(j.status, JobStatus::Pending | JobStatus::Running))
            .count()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue_spec(&self, spec: JobSpec) -> Result<EnqueueResult> {
        let mut jobs = self.jobs.lock().unwrap();

        if let Some(key) = &spec.idempotency_key {
            let live = jobs.iter().find(|j| {
                j.idempotency_key.as_deref() == Some(key.as_str())
                    && matches!(j.status, JobStatus::Pending | JobStatus::Running)
            });
            if let Some(existing) = live {
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        let job = spec.into_job(&self.policy);
        let id = job.id;
        jobs.push(job);
        Ok(EnqueueResult::Created(id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().unwrap();

        let mut ready: Vec<usize> = jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| j.is_ready(now))
            .map(|(i, _)| i)
            .collect();
        ready.sort_by_key(|&i| (jobs[i].priority.as_i16(), jobs[i].next_run_at));
        ready.truncate(limit.max(0) as usize);

        let mut claimed = Vec::with_capacity(ready.len());
        for i in ready {
            let job = &mut jobs[i];
            job.status = JobStatus::Running;
            job.worker_id = Some(worker_id.to_string());
            job.lease_expires_at = Some(now + self.lease);
            job.updated_at = now;
            claimed.push(ClaimedJob {
                id: job.id,
                job: job.clone(),
            });
        }

        Ok(claimed)
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;

        job.status = JobStatus::Succeeded;
        job.lease_expires_at = None;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_failed(
        &self,
        job_id: Uuid,
        error: &str,
        kind: ErrorKind,
    ) -> Result<FailureOutcome> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;

        let retry = self.policy.should_retry(job, kind);
        job.status = if retry {
            JobStatus::Failed
        } else {
            JobStatus::DeadLetter
        };
        job.error_message = Some(error.to_string());
        job.error_kind = Some(kind);
        job.lease_expires_at = None;
        job.updated_at = Utc::now();

        if !retry {
            job.dead_lettered_at = Some(Utc::now());
            return Ok(FailureOutcome::DeadLettered);
        }

        let run_at = self.policy.next_run_at(job.attempt);
        let next = job.create_retry(run_at);
        let next_job_id = next.id;
        jobs.push(next);

        Ok(FailureOutcome::Retrying {
            next_job_id,
            run_at,
        })
    }

    async fn find(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == job_id)
            .cloned())
    }
}
