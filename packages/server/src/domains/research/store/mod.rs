//! Persistence gateway for research requests, results and workflow logs.
//!
//! Activities only talk to [`ResearchStore`]; the Postgres implementation
//! delegates to the sqlx models and the in-memory one backs tests.

mod memory;
mod postgres;

pub use memory::MemoryResearchStore;
pub use postgres::PostgresResearchStore;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::models::{ResearchRequest, ResearchResult, ResearchStatus, WorkflowLog};

#[async_trait]
pub trait ResearchStore: Send + Sync {
    async fn create_request(&self, request: &ResearchRequest) -> Result<ResearchRequest>;

    async fn find_request(&self, id: Uuid) -> Result<Option<ResearchRequest>>;

    /// Newest first
    async fn list_requests_for_user(&self, user_id: Uuid) -> Result<Vec<ResearchRequest>>;

    /// Guarded transition; `None` if the request is missing or the move is not allowed
    async fn update_status(
        &self,
        id: Uuid,
        status: ResearchStatus,
    ) -> Result<Option<ResearchRequest>>;

    async fn append_log(&self, entry: &WorkflowLog) -> Result<WorkflowLog>;

    /// Append order
    async fn list_logs(&self, request_id: Uuid) -> Result<Vec<WorkflowLog>>;

    /// Stores the result unless one exists; always returns the stored result
    async fn create_result(&self, result: &ResearchResult) -> Result<ResearchResult>;

    async fn find_result(&self, request_id: Uuid) -> Result<Option<ResearchResult>>;

    async fn health_check(&self) -> Result<()>;
}
