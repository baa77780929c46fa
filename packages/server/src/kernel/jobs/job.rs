//! Job model for background command execution.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    /// Attempt failed; a retry row was scheduled
    Failed,
    /// Attempt failed and no retries remain
    DeadLetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_priority", rename_all = "snake_case")]
pub enum JobPriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl JobPriority {
    /// Convert to integer for ordering (lower = higher priority)
    pub fn as_i16(&self) -> i16 {
        match self {
            JobPriority::Critical => 0,
            JobPriority::High => 1,
            JobPriority::Normal => 2,
            JobPriority::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_error_kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient error - will retry if attempts remain
    #[default]
    Retryable,
    /// Permanent error - will not retry
    NonRetryable,
}

impl ErrorKind {
    /// Whether this error kind should trigger a retry
    pub fn should_retry(&self) -> bool {
        matches!(self, ErrorKind::Retryable)
    }
}

// ============================================================================
// Job Model
// ============================================================================

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::now_v7())]
    pub id: Uuid,

    // Core identity
    pub job_type: String,
    #[builder(default, setter(strip_option))]
    pub reference_id: Option<Uuid>,
    #[builder(default, setter(strip_option))]
    pub idempotency_key: Option<String>,

    // Payload
    pub args: serde_json::Value,

    // Scheduling
    #[builder(default)]
    pub status: JobStatus,
    #[builder(default)]
    pub priority: JobPriority,
    #[builder(default = Utc::now())]
    pub next_run_at: DateTime<Utc>,
    #[builder(default)]
    pub lease_expires_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub worker_id: Option<String>,

    // Retries: attempt is 1-based
    #[builder(default = 1)]
    pub attempt: i32,
    #[builder(default = 3)]
    pub max_attempts: i32,
    /// First job of the retry chain
    #[builder(default)]
    pub root_job_id: Option<Uuid>,

    // Outcome
    #[builder(default)]
    pub error_message: Option<String>,
    #[builder(default)]
    pub error_kind: Option<ErrorKind>,
    #[builder(default)]
    pub dead_lettered_at: Option<DateTime<Utc>>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether the job may be claimed at `now`
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            JobStatus::Pending => self.next_run_at <= now,
            // Lease expired: the worker died mid-run
            JobStatus::Running => self.lease_expires_at.is_some_and(|lease| lease < now),
            _ => false,
        }
    }

    /// Whether a failure of this attempt exhausts the retry budget
    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Create the follow-up job for a failed attempt
    pub fn create_retry(&self, scheduled_for: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            job_type: self.job_type.clone(),
            reference_id: self.reference_id,
            idempotency_key: self.idempotency_key.clone(),
            args: self.args.clone(),
            status: JobStatus::Pending,
            priority: self.priority,
            next_run_at: scheduled_for,
            lease_expires_at: None,
            worker_id: None,
            attempt: self.attempt + 1,
            max_attempts: self.max_attempts,
            root_job_id: self.root_job_id.or(Some(self.id)),
            error_message: None,
            error_kind: None,
            dead_lettered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub async fn insert<'e>(&self, executor: impl PgExecutor<'e>) -> Result<Self> {
        let job = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO jobs (
                id, job_type, reference_id, idempotency_key, args, status, priority,
                next_run_at, lease_expires_at, worker_id, attempt, max_attempts, root_job_id,
                error_message, error_kind, dead_lettered_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.job_type)
        .bind(self.reference_id)
        .bind(&self.idempotency_key)
        .bind(&self.args)
        .bind(self.status)
        .bind(self.priority)
        .bind(self.next_run_at)
        .bind(self.lease_expires_at)
        .bind(&self.worker_id)
        .bind(self.attempt)
        .bind(self.max_attempts)
        .bind(self.root_job_id)
        .bind(&self.error_message)
        .bind(self.error_kind)
        .bind(self.dead_lettered_at)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(executor)
        .await?;

        Ok(job)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find a live (pending/running) job holding an idempotency key
    pub async fn find_by_idempotency_key(key: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM jobs
            WHERE idempotency_key = $1
              AND status IN ('pending', 'running')
            LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Claim jobs atomically using FOR UPDATE SKIP LOCKED
    /// Also recovers stale jobs with expired leases
    pub async fn claim_jobs(
        limit: i64,
        worker_id: &str,
        lease_duration_ms: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let jobs = sqlx::query_as::<_, Self>(
            r#"
            WITH next_jobs AS (
                SELECT id
                FROM jobs
                WHERE (status = 'pending' AND next_run_at <= NOW())
                   OR (status = 'running' AND lease_expires_at < NOW())
                ORDER BY priority, next_run_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE jobs
            SET status = 'running',
                lease_expires_at = NOW() + ($2 || ' milliseconds')::INTERVAL,
                worker_id = $3,
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_jobs)
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(lease_duration_ms.to_string())
        .bind(worker_id)
        .fetch_all(pool)
        .await?;

        Ok(jobs)
    }

    pub async fn mark_succeeded(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'succeeded',
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Record the failure of this attempt; `dead_letter` ends the chain
    pub async fn mark_failed(
        id: Uuid,
        error: &str,
        kind: ErrorKind,
        dead_letter: bool,
        executor: impl PgExecutor<'_>,
    ) -> Result<()> {
        let status = if dead_letter {
            JobStatus::DeadLetter
        } else {
            JobStatus::Failed
        };

        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $2,
                error_message = $3,
                error_kind = $4,
                dead_lettered_at = CASE WHEN $5 THEN NOW() ELSE NULL END,
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error)
        .bind(kind)
        .bind(dead_letter)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_job() -> Job {
        Job::builder()
            .job_type("test_job")
            .args(serde_json::json!({}))
            .build()
    }

    #[test]
    fn new_job_starts_pending_on_first_attempt() {
        let job = sample_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt, 1);
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.priority, JobPriority::Normal);
    }

    #[test]
    fn is_ready_pending_job_due_now() {
        let job = sample_job();
        assert!(job.is_ready(Utc::now() + Duration::milliseconds(1)));
    }

    #[test]
    fn is_ready_future_job_is_not_ready() {
        let mut job = sample_job();
        job.next_run_at = Utc::now() + Duration::seconds(30);
        assert!(!job.is_ready(Utc::now()));
    }

    #[test]
    fn is_ready_running_job_only_after_lease_expiry() {
        let mut job = sample_job();
        job.status = JobStatus::Running;
        job.lease_expires_at = Some(Utc::now() + Duration::seconds(60));
        assert!(!job.is_ready(Utc::now()));

        job.lease_expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(job.is_ready(Utc::now()));
    }

    #[test]
    fn create_retry_increments_attempt_and_links_root() {
        let job = sample_job();
        let at = Utc::now() + Duration::seconds(2);
        let retry = job.create_retry(at);

        assert_ne!(retry.id, job.id);
        assert_eq!(retry.attempt, 2);
        assert_eq!(retry.root_job_id, Some(job.id));
        assert_eq!(retry.next_run_at, at);
        assert_eq!(retry.status, JobStatus::Pending);

        let third = retry.create_retry(at);
        assert_eq!(third.root_job_id, Some(job.id));
        assert!(third.is_final_attempt());
    }

    #[test]
    fn retryable_error_should_retry() {
        assert!(ErrorKind::Retryable.should_retry());
        assert!(!ErrorKind::NonRetryable.should_retry());
    }

    #[test]
    fn priority_ordering_is_correct() {
        assert!(JobPriority::Critical.as_i16() < JobPriority::High.as_i16());
        assert!(JobPriority::High.as_i16() < JobPriority::Normal.as_i16());
        assert!(JobPriority::Normal.as_i16() < JobPriority::Low.as_i16());
    }
}
