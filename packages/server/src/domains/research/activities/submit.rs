//! Research submission: validate, store the request, enqueue its job.

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::common::AiProvider;
use crate::domains::research::errors::ValidationError;
use crate::domains::research::jobs::RunResearchJob;
use crate::domains::research::models::{ResearchRequest, ResearchStatus};
use crate::kernel::jobs::JobQueueExt;
use crate::kernel::ServerDeps;

pub const MAX_TOPIC_CHARS: usize = 255;

/// Raw submission body. Every field is optional so that missing values
/// surface as validation errors rather than decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResearchInput {
    pub topic: Option<String>,
    pub provider: Option<String>,
    pub user_id: Option<String>,
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub topic: String,
    pub provider: AiProvider,
    pub user_id: Uuid,
}

impl SubmitResearchInput {
    pub fn validate(self) -> Result<ValidSubmission, ValidationError> {
        let topic = validate_topic(self.topic.as_deref())?;
        let user_id = self
            .user_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id.trim()).ok())
            .ok_or(ValidationError::InvalidUserId)?;
        let provider = parse_provider(self.provider.as_deref())?;

        Ok(ValidSubmission {
            topic,
            provider,
            user_id,
        })
    }
}

/// Trimmed topic; required, at most [`MAX_TOPIC_CHARS`] characters.
pub fn validate_topic(topic: Option<&str>) -> Result<String, ValidationError> {
    let topic = topic
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ValidationError::MissingTopic)?;

    if topic.chars().count() > MAX_TOPIC_CHARS {
        return Err(ValidationError::TopicTooLong {
            max: MAX_TOPIC_CHARS,
        });
    }
    Ok(topic.to_string())
}

/// Absent means the default provider.
pub fn parse_provider(provider: Option<&str>) -> Result<AiProvider, ValidationError> {
    match provider {
        None => Ok(AiProvider::default()),
        Some(value) => value
            .parse()
            .map_err(|_| ValidationError::UnknownProvider(value.to_string())),
    }
}

/// Validate a submission, store it as `pending` and enqueue exactly one job.
///
/// Invalid input is rejected before anything is written. If the job cannot be
/// enqueued the stored request is marked `failed` before the error returns.
pub async fn submit_research(
    input: SubmitResearchInput,
    deps: &ServerDeps,
) -> Result<ResearchRequest> {
    let submission = input.validate()?;

    let request = deps
        .store
        .create_request(&ResearchRequest::new(
            submission.topic,
            submission.user_id,
            submission.provider,
        ))
        .await?;

    let job = RunResearchJob::new(request.id, request.topic.clone(), request.provider);
    let enqueued = match deps.jobs.enqueue(job).await {
        Ok(enqueued) => enqueued,
        Err(e) => {
            error!(request_id = %request.id, error = %e, "failed to enqueue research job");
            if let Err(status_err) = deps
                .store
                .update_status(request.id, ResearchStatus::Failed)
                .await
            {
                error!(request_id = %request.id, error = %status_err, "failed to mark research request failed");
            }
            return Err(e);
        }
    };

    info!(
        request_id = %request.id,
        user_id = %request.user_id,
        provider = %request.provider,
        job_id = %enqueued.job_id(),
        "research request submitted"
    );

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{FailingJobQueue, TestDependencies};
    use std::sync::Arc;

    fn input(topic: Option<&str>, provider: Option<&str>, user_id: Option<&str>) -> SubmitResearchInput {
        SubmitResearchInput {
            topic: topic.map(String::from),
            provider: provider.map(String::from),
            user_id: user_id.map(String::from),
        }
    }

    fn user() -> String {
        Uuid::new_v4().to_string()
    }

    #[tokio::test]
    async fn test_enqueue_failure_marks_request_failed() {
        let test_deps = TestDependencies::new().job_queue(Arc::new(FailingJobQueue));
        let deps = test_deps.into_server_deps();
        let user_id = user();

        let err = submit_research(input(Some("AI"), None, Some(&user_id)), &deps)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "job queue unavailable");

        let requests = deps
            .store
            .list_requests_for_user(user_id.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].status, ResearchStatus::Failed);
    }

    #[test]
    fn test_valid_input_is_trimmed() {
        let user_id = user();
        let valid = input(Some("  AI trends  "), Some("openai"), Some(&user_id))
            .validate()
            .unwrap();

        assert_eq!(valid.topic, "AI trends");
        assert_eq!(valid.provider, AiProvider::OpenAi);
        assert_eq!(valid.user_id.to_string(), user_id);
    }

    #[test]
    fn test_provider_defaults_to_anthropic() {
        let valid = input(Some("AI"), None, Some(&user())).validate().unwrap();
        assert_eq!(valid.provider, AiProvider::Anthropic);
    }

    #[test]
    fn test_blank_topic_rejected() {
        for topic in [None, Some(""), Some("   ")] {
            assert_eq!(
                input(topic, None, Some(&user())).validate(),
                Err(ValidationError::MissingTopic)
            );
        }
    }

    #[test]
    fn test_topic_length_counts_characters() {
        let exactly = "é".repeat(MAX_TOPIC_CHARS);
        assert!(input(Some(&exactly), None, Some(&user())).validate().is_ok());

        let over = "a".repeat(MAX_TOPIC_CHARS + 1);
        assert_eq!(
            input(Some(&over), None, Some(&user())).validate(),
            Err(ValidationError::TopicTooLong { max: 255 })
        );
    }

    #[test]
    fn test_user_id_must_be_uuid() {
        assert_eq!(
            input(Some("AI"), None, Some("not-a-uuid")).validate(),
            Err(ValidationError::InvalidUserId)
        );
        assert_eq!(
            input(Some("AI"), None, None).validate(),
            Err(ValidationError::InvalidUserId)
        );
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = input(Some("AI"), Some("gemini"), Some(&user()))
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provider must be either \"openai\" or \"anthropic\""
        );
    }
}
