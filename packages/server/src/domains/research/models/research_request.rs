use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::AiProvider;

/// Lifecycle of a research request.
///
/// `Pending → Processing → {Completed, Failed}`; terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "research_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResearchStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ResearchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchStatus::Pending => "pending",
            ResearchStatus::Processing => "processing",
            ResearchStatus::Completed => "completed",
            ResearchStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResearchStatus::Completed | ResearchStatus::Failed)
    }

    /// States a request may be in when moving to `self`.
    ///
    /// Re-entering `Processing` is allowed so a retried job can restart its
    /// stages; nothing ever leaves a terminal state or returns to `Pending`.
    pub fn allowed_predecessors(&self) -> &'static [ResearchStatus] {
        match self {
            ResearchStatus::Pending => &[],
            ResearchStatus::Processing | ResearchStatus::Completed | ResearchStatus::Failed => {
                &[ResearchStatus::Pending, ResearchStatus::Processing]
            }
        }
    }

    pub fn can_transition_to(&self, next: ResearchStatus) -> bool {
        next.allowed_predecessors().contains(self)
    }
}

/// ResearchRequest model - SQL persistence layer
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    pub id: Uuid,
    /// Trimmed, 1-255 characters
    pub topic: String,
    pub user_id: Uuid,
    pub status: ResearchStatus,
    pub provider: AiProvider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResearchRequest {
    /// A new pending request. Validation happens before this is called.
    pub fn new(topic: impl Into<String>, user_id: Uuid, provider: AiProvider) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            user_id,
            status: ResearchStatus::Pending,
            provider,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO research_requests (id, topic, user_id, status, provider, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(self.id)
        .bind(&self.topic)
        .bind(self.user_id)
        .bind(self.status)
        .bind(self.provider)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM research_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// All requests of one user, newest first
    pub async fn find_by_user(user_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM research_requests WHERE user_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Move to `status` if the current state allows it.
    ///
    /// Returns `None` when the request is missing or the transition is refused.
    pub async fn update_status(
        id: Uuid,
        status: ResearchStatus,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let predecessors: Vec<&str> = status
            .allowed_predecessors()
            .iter()
            .map(ResearchStatus::as_str)
            .collect();

        sqlx::query_as::<_, Self>(
            "UPDATE research_requests
             SET status = $2, updated_at = NOW()
             WHERE id = $1
               AND status::text = ANY($3)
             RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(predecessors)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_pending() {
        let request = ResearchRequest::new("AI trends", Uuid::new_v4(), AiProvider::OpenAi);
        assert_eq!(request.status, ResearchStatus::Pending);
        assert_eq!(request.created_at, request.updated_at);
    }

    #[test]
    fn test_forward_transitions() {
        use ResearchStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Failed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        use ResearchStatus::*;
        for terminal in [Completed, Failed] {
            assert!(terminal.is_terminal());
            for next in [Pending, Processing, Completed, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn test_serializes_camel_case() {
        let request = ResearchRequest::new("t", Uuid::new_v4(), AiProvider::Anthropic);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["provider"], "anthropic");
        assert!(json.get("userId").is_some());
        assert!(json.get("createdAt").is_some());
    }
}
