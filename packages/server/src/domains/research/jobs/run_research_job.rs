//! RunResearchJob - background execution of one research request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::AiProvider;
use crate::kernel::jobs::{CommandMeta, JobPriority};

/// Job that runs the four-stage research pipeline for a request.
///
/// # Usage
///
/// ```ignore
/// let job = RunResearchJob::new(request.id, request.topic.clone(), request.provider);
/// deps.jobs.enqueue(job).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResearchJob {
    pub request_id: Uuid,
    pub topic: String,
    #[serde(default)]
    pub provider: AiProvider,
}

impl RunResearchJob {
    /// The job type identifier used in the jobs table.
    pub const JOB_TYPE: &'static str = "process_research";

    pub fn new(request_id: Uuid, topic: impl Into<String>, provider: AiProvider) -> Self {
        Self {
            request_id,
            topic: topic.into(),
            provider,
        }
    }
}

impl CommandMeta for RunResearchJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }

    /// One live job per request
    fn idempotency_key(&self) -> Option<String> {
        Some(format!("{}:{}", Self::JOB_TYPE, self.request_id))
    }

    fn reference_id(&self) -> Option<Uuid> {
        Some(self.request_id)
    }

    fn priority(&self) -> JobPriority {
        JobPriority::Normal
    }
}
