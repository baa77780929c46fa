//! Job queue abstraction and its PostgreSQL implementation.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::job::{ErrorKind, Job, JobPriority};
use crate::config::JobSettings;

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Command was enqueued, returns new job ID
    Created(Uuid),
    /// Command already exists (idempotency hit), returns existing job ID
    Duplicate(Uuid),
}

impl EnqueueResult {
    /// Get the job ID regardless of whether it was created or duplicate
    pub fn job_id(&self) -> Uuid {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    /// Returns true if this was a newly created job
    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// A follow-up attempt was scheduled
    Retrying { next_job_id: Uuid, run_at: DateTime<Utc> },
    /// No retries left (or the error was permanent)
    DeadLettered,
}

/// A claimed job ready for execution.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    /// The job ID
    pub id: Uuid,
    /// The raw job record
    pub job: Job,
}

impl ClaimedJob {
    /// Deserialize the command payload.
    pub fn deserialize<C: DeserializeOwned>(&self) -> Result<C> {
        serde_json::from_value(self.job.args.clone())
            .map_err(|e| anyhow!("failed to deserialize command: {}", e))
    }

    /// Get the command type (job_type)
    pub fn command_type(&self) -> &str {
        &self.job.job_type
    }
}

/// Metadata for command serialization.
///
/// Commands implement this trait to provide type information
/// and optional idempotency keys.
pub trait CommandMeta {
    /// The command type name (used as job_type).
    fn command_type(&self) -> &'static str;

    /// Optional idempotency key.
    ///
    /// If provided, ensures only one pending/running job exists with this key.
    fn idempotency_key(&self) -> Option<String> {
        None
    }

    /// Optional priority override.
    fn priority(&self) -> JobPriority {
        JobPriority::Normal
    }

    /// Optional reference ID (the entity this job works on).
    fn reference_id(&self) -> Option<Uuid> {
        None
    }

    /// Attempt budget for this command; `None` uses the queue's retry policy.
    fn max_attempts(&self) -> Option<i32> {
        None
    }
}

/// A serialized command ready to be stored.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub job_type: String,
    pub args: serde_json::Value,
    pub reference_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
    pub priority: JobPriority,
    pub max_attempts: Option<i32>,
    pub run_at: Option<DateTime<Utc>>,
}

impl JobSpec {
    /// Serialize a command into a spec.
    pub fn from_command<C>(command: &C) -> Result<Self>
    where
        C: Serialize + CommandMeta,
    {
        Ok(Self {
            job_type: command.command_type().to_string(),
            args: serde_json::to_value(command).context("failed to serialize command")?,
            reference_id: command.reference_id(),
            idempotency_key: command.idempotency_key(),
            priority: command.priority(),
            max_attempts: command.max_attempts(),
            run_at: None,
        })
    }

    /// Build the pending job row for this spec.
    pub fn into_job(self, policy: &RetryPolicy) -> Job {
        let mut job = Job::builder()
            .job_type(self.job_type)
            .args(self.args)
            .priority(self.priority)
            .max_attempts(self.max_attempts.unwrap_or(policy.max_attempts).max(1))
            .next_run_at(self.run_at.unwrap_or_else(Utc::now))
            .build();
        job.reference_id = self.reference_id;
        job.idempotency_key = self.idempotency_key;
        job
    }
}

/// Retry budget and exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_secs(3600),
        }
    }
}

impl From<&JobSettings> for RetryPolicy {
    fn from(settings: &JobSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.backoff_base,
            ..Default::default()
        }
    }
}

impl RetryPolicy {
    /// No backoff (tests).
    pub fn immediate(max_attempts: i32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before the attempt after `failed_attempt` (1-based): base * 2^(n-1).
    pub fn delay_after(&self, failed_attempt: i32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).clamp(0, 20) as u32;
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay)
    }

    /// Decide whether a failed job gets another attempt.
    pub fn should_retry(&self, job: &Job, kind: ErrorKind) -> bool {
        kind.should_retry() && !job.is_final_attempt()
    }

    pub fn next_run_at(&self, failed_attempt: i32) -> DateTime<Utc> {
        let delay = chrono::Duration::from_std(self.delay_after(failed_attempt))
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        Utc::now() + delay
    }
}

/// Trait for job queue operations.
///
/// Implementations store serialized commands for background execution.
/// Delivery is at-least-once: a job whose lease expires is claimed again.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Store a command for execution.
    ///
    /// If the spec carries an idempotency key and a matching pending/running
    /// job exists, returns `EnqueueResult::Duplicate` with the existing job ID.
    async fn enqueue_spec(&self, spec: JobSpec) -> Result<EnqueueResult>;

    /// Claim up to `limit` ready jobs for processing.
    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>>;

    /// Mark a job as successfully completed.
    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()>;

    /// Mark a job as failed with an error.
    ///
    /// If retries remain, a follow-up job is scheduled with backoff.
    /// Otherwise the job is moved to dead letter.
    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind)
        -> Result<FailureOutcome>;

    /// Look up a job by ID.
    async fn find(&self, job_id: Uuid) -> Result<Option<Job>>;
}

/// Typed enqueueing for any [`JobQueue`].
#[async_trait]
pub trait JobQueueExt {
    /// Enqueue a command for immediate execution.
    async fn enqueue<C>(&self, command: C) -> Result<EnqueueResult>
    where
        C: Serialize + CommandMeta + Send + Sync;

    /// Schedule a command for future execution.
    async fn schedule<C>(&self, command: C, run_at: DateTime<Utc>) -> Result<EnqueueResult>
    where
        C: Serialize + CommandMeta + Send + Sync;
}

#[async_trait]
impl<Q: JobQueue + ?Sized> JobQueueExt for Q {
    async fn enqueue<C>(&self, command: C) -> Result<EnqueueResult>
    where
        C: Serialize + CommandMeta + Send + Sync,
    {
        let spec = JobSpec::from_command(&command)?;
        self.enqueue_spec(spec).await
    }

    async fn schedule<C>(&self, command: C, run_at: DateTime<Utc>) -> Result<EnqueueResult>
    where
        C: Serialize + CommandMeta + Send + Sync,
    {
        let mut spec = JobSpec::from_command(&command)?;
        spec.run_at = Some(run_at);
        self.enqueue_spec(spec).await
    }
}

/// PostgreSQL-backed job queue implementation.
pub struct PostgresJobQueue {
    pool: PgPool,
    policy: RetryPolicy,
    default_lease_ms: i64,
}

impl PostgresJobQueue {
    /// Create a new PostgreSQL job queue.
    pub fn new(pool: PgPool, policy: RetryPolicy) -> Self {
        Self {
            pool,
            policy,
            default_lease_ms: 5 * 60_000, // research jobs make many slow AI calls
        }
    }

    /// Create with a custom lease duration.
    pub fn with_lease_duration(mut self, lease_ms: i64) -> Self {
        self.default_lease_ms = lease_ms;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn enqueue_spec(&self, spec: JobSpec) -> Result<EnqueueResult> {
        if let Some(key) = &spec.idempotency_key {
            if let Some(existing) = Job::find_by_idempotency_key(key, &self.pool).await? {
                debug!(job_id = %existing.id, idempotency_key = %key, "found existing job with idempotency key");
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        let job = spec.into_job(&self.policy);
        let inserted = job.insert(&self.pool).await?;

        debug!(job_id = %inserted.id, job_type = %inserted.job_type, "job enqueued");
        Ok(EnqueueResult::Created(inserted.id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        let jobs = Job::claim_jobs(limit, worker_id, self.default_lease_ms, &self.pool).await?;

        Ok(jobs
            .into_iter()
            .map(|job| ClaimedJob { id: job.id, job })
            .collect())
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        Job::mark_succeeded(job_id, &self.pool).await
    }

    async fn mark_failed(
        &self,
        job_id: Uuid,
        error: &str,
        kind: ErrorKind,
    ) -> Result<FailureOutcome> {
        let job = Job::find_by_id(job_id, &self.pool)
            .await?
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;

        if self.policy.should_retry(&job, kind) {
            let run_at = self.policy.next_run_at(job.attempt);
            let mut tx = self.pool.begin().await?;

            // Release the idempotency key before the retry row takes it over
            Job::mark_failed(job_id, error, kind, false, &mut *tx).await?;
            let retry = job.create_retry(run_at).insert(&mut *tx).await?;
            tx.commit().await?;

            info!(job_id = %job_id, next_job_id = %retry.id, attempt = retry.attempt, run_at = %run_at, "job retry scheduled");
            Ok(FailureOutcome::Retrying {
                next_job_id: retry.id,
                run_at,
            })
        } else {
            Job::mark_failed(job_id, error, kind, true, &self.pool).await?;
            warn!(job_id = %job_id, attempt = job.attempt, "job dead-lettered");
            Ok(FailureOutcome::DeadLettered)
        }
    }

    async fn find(&self, job_id: Uuid) -> Result<Option<Job>> {
        Job::find_by_id(job_id, &self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct PingCommand {
        target: Uuid,
    }

    impl CommandMeta for PingCommand {
        fn command_type(&self) -> &'static str {
            "ping"
        }

        fn reference_id(&self) -> Option<Uuid> {
            Some(self.target)
        }

        fn idempotency_key(&self) -> Option<String> {
            Some(format!("ping:{}", self.target))
        }
    }

    #[test]
    fn test_enqueue_result_helpers() {
        let created = EnqueueResult::Created(Uuid::new_v4());
        assert!(created.is_created());

        let duplicate = EnqueueResult::Duplicate(Uuid::new_v4());
        assert!(!duplicate.is_created());
    }

    #[test]
    fn test_spec_from_command() {
        let target = Uuid::new_v4();
        let spec = JobSpec::from_command(&PingCommand { target }).unwrap();

        assert_eq!(spec.job_type, "ping");
        assert_eq!(spec.reference_id, Some(target));
        assert_eq!(spec.args["target"], serde_json::json!(target));

        let job = spec.into_job(&RetryPolicy::default());
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.idempotency_key, Some(format!("ping:{}", target)));
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(30), Duration::from_secs(3600));
        assert_eq!(RetryPolicy::immediate(3).delay_after(2), Duration::ZERO);
    }

    #[test]
    fn test_should_retry_respects_budget_and_kind() {
        let policy = RetryPolicy::default();
        let mut job = JobSpec::from_command(&PingCommand { target: Uuid::new_v4() })
            .unwrap()
            .into_job(&policy);

        assert!(policy.should_retry(&job, ErrorKind::Retryable));
        assert!(!policy.should_retry(&job, ErrorKind::NonRetryable));

        job.attempt = 3;
        assert!(!policy.should_retry(&job, ErrorKind::Retryable));
    }

    #[test]
    fn test_policy_from_job_settings() {
        let settings = JobSettings {
            max_attempts: 5,
            backoff_base: Duration::from_millis(100),
            ..Default::default()
        };
        let policy = RetryPolicy::from(&settings);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
    }
}
