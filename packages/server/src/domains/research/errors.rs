//! Errors the research activities surface to callers.

use uuid::Uuid;

/// Caller input rejected before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Topic is required and must be a non-empty string")]
    MissingTopic,

    #[error("Topic must be at most {max} characters")]
    TopicTooLong { max: usize },

    #[error("A valid userId must be provided")]
    InvalidUserId,

    #[error("A valid userId query parameter is required")]
    MissingUserIdParam,

    #[error("Provider must be either \"openai\" or \"anthropic\"")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Research request not found")]
pub struct ResearchNotFound(pub Uuid);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("You are not authorized to access this research")]
pub struct ResearchAccessDenied {
    pub request_id: Uuid,
    pub user_id: Uuid,
}
