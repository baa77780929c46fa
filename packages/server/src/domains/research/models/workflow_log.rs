use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::research::data::WorkflowStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "workflow_log_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WorkflowLogStatus {
    Started,
    Completed,
    Failed,
}

/// One append-only workflow log entry.
///
/// Rows are read back in append order (`seq`), which the aggregator relies on.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowLog {
    pub id: Uuid,
    pub request_id: Uuid,
    #[sqlx(try_from = "String")]
    pub step: WorkflowStep,
    pub status: WorkflowLogStatus,
    /// Empty when the entry carries no message
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl WorkflowLog {
    pub fn new(
        request_id: Uuid,
        step: WorkflowStep,
        status: WorkflowLogStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            step,
            status,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO workflow_logs (id, request_id, step, status, message, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, request_id, step, status, COALESCE(message, '') AS message, timestamp",
        )
        .bind(self.id)
        .bind(self.request_id)
        .bind(self.step.as_str())
        .bind(self.status)
        .bind(&self.message)
        .bind(self.timestamp)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Entries of one request in append order
    pub async fn find_by_request(request_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT id, request_id, step, status, COALESCE(message, '') AS message, timestamp
             FROM workflow_logs
             WHERE request_id = $1
             ORDER BY seq ASC",
        )
        .bind(request_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
