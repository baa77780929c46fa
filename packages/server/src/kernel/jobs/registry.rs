//! Job registry for deserializing and executing jobs.
//!
//! The registry maps job type strings (e.g., "process_research") to handlers
//! that reconstruct the typed job from its JSON payload and run it. The
//! [`JobRunner`](super::JobRunner) dispatches claimed jobs through it without
//! knowing the concrete types.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::queue::{ClaimedJob, CommandMeta};
use crate::kernel::ServerDeps;

/// Errors raised by the registry itself, before a handler runs.
///
/// Retrying cannot fix either of these, so the runner dead-letters them.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Failed to deserialize {job_type}: {message}")]
    InvalidPayload { job_type: String, message: String },
}

/// Where a handler invocation sits in its job's retry chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobContext {
    pub job_id: Uuid,
    /// 1-based
    pub attempt: i32,
    pub max_attempts: i32,
}

impl JobContext {
    /// Context for a single, non-retried invocation.
    pub fn single_attempt(job_id: Uuid) -> Self {
        Self {
            job_id,
            attempt: 1,
            max_attempts: 1,
        }
    }

    /// A failure in this attempt will not be retried.
    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

impl From<&ClaimedJob> for JobContext {
    fn from(claimed: &ClaimedJob) -> Self {
        Self {
            job_id: claimed.id,
            attempt: claimed.job.attempt,
            max_attempts: claimed.job.max_attempts,
        }
    }
}

type BoxedHandler = Box<
    dyn Fn(
            serde_json::Value,
            JobContext,
            Arc<ServerDeps>,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// Registry that maps job type strings to handlers.
///
/// ```ignore
/// let mut registry = JobRegistry::new();
/// registry.register::<RunResearchJob, _, _>(
///     RunResearchJob::JOB_TYPE,
///     |job, ctx, deps| async move { run_research(&job, ctx, &deps).await },
/// );
/// registry.execute(&claimed_job, deps.clone()).await?;
/// ```
#[derive(Default)]
pub struct JobRegistry {
    handlers: HashMap<&'static str, BoxedHandler>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job type with its handler.
    pub fn register<J, F, Fut>(&mut self, job_type: &'static str, handler: F)
    where
        J: CommandMeta + DeserializeOwned + Send + Sync + 'static,
        F: Fn(J, JobContext, Arc<ServerDeps>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let boxed: BoxedHandler = Box::new(move |value, ctx, deps| {
            let handler = handler.clone();
            Box::pin(async move {
                let job: J =
                    serde_json::from_value(value).map_err(|e| RegistryError::InvalidPayload {
                        job_type: job_type.to_string(),
                        message: e.to_string(),
                    })?;
                handler(job, ctx, deps).await
            })
        });

        self.handlers.insert(job_type, boxed);
    }

    /// Execute a claimed job using its registered handler.
    pub async fn execute(&self, job: &ClaimedJob, deps: Arc<ServerDeps>) -> Result<()> {
        let job_type = job.command_type();
        let handler = self
            .handlers
            .get(job_type)
            .ok_or_else(|| RegistryError::UnknownJobType(job_type.to_string()))?;

        handler(job.job.args.clone(), JobContext::from(job), deps).await
    }

    pub fn is_registered(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }
}

/// Thread-safe registry wrapped in Arc.
pub type SharedJobRegistry = Arc<JobRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct EchoJob {
        name: String,
    }

    impl CommandMeta for EchoJob {
        fn command_type(&self) -> &'static str {
            "echo"
        }
    }

    #[test]
    fn test_register_and_check() {
        let mut registry = JobRegistry::new();
        registry.register::<EchoJob, _, _>("echo", |_job, _ctx, _deps| async move { Ok(()) });

        assert!(registry.is_registered("echo"));
        assert!(!registry.is_registered("unknown_job"));
        assert_eq!(registry.registered_types(), vec!["echo"]);
    }

    #[test]
    fn test_context_final_attempt() {
        let id = Uuid::new_v4();
        assert!(JobContext::single_attempt(id).is_final_attempt());

        let ctx = JobContext {
            job_id: id,
            attempt: 2,
            max_attempts: 3,
        };
        assert!(!ctx.is_final_attempt());
    }

    #[test]
    fn test_registry_error_messages() {
        let err = RegistryError::UnknownJobType("nope".into());
        assert_eq!(err.to_string(), "Unknown job type: nope");

        let err = RegistryError::InvalidPayload {
            job_type: "echo".into(),
            message: "missing field `name`".into(),
        };
        assert!(err.to_string().starts_with("Failed to deserialize echo"));
    }
}
