use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::ResearchStore;
use crate::domains::research::models::{
    ResearchRequest, ResearchResult, ResearchStatus, WorkflowLog,
};

pub struct PostgresResearchStore {
    pool: PgPool,
}

impl PostgresResearchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ResearchStore for PostgresResearchStore {
    async fn create_request(&self, request: &ResearchRequest) -> Result<ResearchRequest> {
        request.insert(&self.pool).await
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<ResearchRequest>> {
        ResearchRequest::find_by_id(id, &self.pool).await
    }

    async fn list_requests_for_user(&self, user_id: Uuid) -> Result<Vec<ResearchRequest>> {
        ResearchRequest::find_by_user(user_id, &self.pool).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ResearchStatus,
    ) -> Result<Option<ResearchRequest>> {
        ResearchRequest::update_status(id, status, &self.pool).await
    }

    async fn append_log(&self, entry: &WorkflowLog) -> Result<WorkflowLog> {
        entry.insert(&self.pool).await
    }

    async fn list_logs(&self, request_id: Uuid) -> Result<Vec<WorkflowLog>> {
        WorkflowLog::find_by_request(request_id, &self.pool).await
    }

    async fn create_result(&self, result: &ResearchResult) -> Result<ResearchResult> {
        result.insert_once(&self.pool).await
    }

    async fn find_result(&self, request_id: Uuid) -> Result<Option<ResearchResult>> {
        ResearchResult::find_by_request(request_id, &self.pool).await
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
