use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::ResearchStore;
use crate::domains::research::models::{
    ResearchRequest, ResearchResult, ResearchStatus, WorkflowLog,
};

/// In-memory research storage for tests and development.
///
/// Enforces the same rules as the SQL schema: logs and results need an
/// existing request, one result per request, guarded status transitions.
#[derive(Default)]
pub struct MemoryResearchStore {
    /// Insertion order
    requests: RwLock<Vec<ResearchRequest>>,
    /// Append order
    logs: RwLock<Vec<WorkflowLog>>,
    results: RwLock<HashMap<Uuid, ResearchResult>>,
}

impl MemoryResearchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.read().unwrap().len()
    }

    pub fn result_count(&self) -> usize {
        self.results.read().unwrap().len()
    }

    fn request_exists(&self, id: Uuid) -> bool {
        self.requests.read().unwrap().iter().any(|r| r.id == id)
    }
}

#[async_trait]
impl ResearchStore for MemoryResearchStore {
    async fn create_request(&self, request: &ResearchRequest) -> Result<ResearchRequest> {
        let mut requests = self.requests.write().unwrap();
        if requests.iter().any(|r| r.id == request.id) {
            bail!("research request {} already exists", request.id);
        }
        requests.push(request.clone());
        Ok(request.clone())
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<ResearchRequest>> {
        Ok(self
            .requests
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_requests_for_user(&self, user_id: Uuid) -> Result<Vec<ResearchRequest>> {
        let mut owned: Vec<ResearchRequest> = self
            .requests
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        // Later inserts first on equal timestamps
        owned.reverse();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ResearchStatus,
    ) -> Result<Option<ResearchRequest>> {
        let mut requests = self.requests.write().unwrap();
        let Some(request) = requests.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        if !request.status.can_transition_to(status) {
            return Ok(None);
        }

        request.status = status;
        request.updated_at = Utc::now();
        Ok(Some(request.clone()))
    }

    async fn append_log(&self, entry: &WorkflowLog) -> Result<WorkflowLog> {
        if !self.request_exists(entry.request_id) {
            bail!("research request {} not found", entry.request_id);
        }
        self.logs.write().unwrap().push(entry.clone());
        Ok(entry.clone())
    }

    async fn list_logs(&self, request_id: Uuid) -> Result<Vec<WorkflowLog>> {
        Ok(self
            .logs
            .read()
            .unwrap()
            .iter()
            .filter(|l| l.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn create_result(&self, result: &ResearchResult) -> Result<ResearchResult> {
        if !self.request_exists(result.request_id) {
            bail!("research request {} not found", result.request_id);
        }
        Ok(self
            .results
            .write()
            .unwrap()
            .entry(result.request_id)
            .or_insert_with(|| result.clone())
            .clone())
    }

    async fn find_result(&self, request_id: Uuid) -> Result<Option<ResearchResult>> {
        Ok(self.results.read().unwrap().get(&request_id).cloned())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::AiProvider;
    use crate::domains::research::data::WorkflowStep;
    use crate::domains::research::models::WorkflowLogStatus;

    async fn seeded() -> (MemoryResearchStore, ResearchRequest) {
        let store = MemoryResearchStore::new();
        let request = ResearchRequest::new("topic", Uuid::new_v4(), AiProvider::Anthropic);
        store.create_request(&request).await.unwrap();
        (store, request)
    }

    #[tokio::test]
    async fn test_status_transitions_are_guarded() {
        let (store, request) = seeded().await;

        let updated = store
            .update_status(request.id, ResearchStatus::Completed)
            .await
            .unwrap();
        assert_eq!(updated.unwrap().status, ResearchStatus::Completed);

        let refused = store
            .update_status(request.id, ResearchStatus::Failed)
            .await
            .unwrap();
        assert!(refused.is_none());

        let current = store.find_request(request.id).await.unwrap().unwrap();
        assert_eq!(current.status, ResearchStatus::Completed);
    }

    #[tokio::test]
    async fn test_second_result_is_ignored() {
        let (store, request) = seeded().await;

        let first = ResearchResult::new(request.id, vec![], vec!["one".into()], None);
        let second = ResearchResult::new(request.id, vec![], vec!["two".into()], None);

        store.create_result(&first).await.unwrap();
        let stored = store.create_result(&second).await.unwrap();

        assert_eq!(stored.id, first.id);
        assert_eq!(store.result_count(), 1);
    }

    #[tokio::test]
    async fn test_logs_need_an_existing_request() {
        let store = MemoryResearchStore::new();
        let entry = WorkflowLog::new(
            Uuid::new_v4(),
            WorkflowStep::InputParsing,
            WorkflowLogStatus::Started,
            "",
        );
        assert!(store.append_log(&entry).await.is_err());
    }

    #[tokio::test]
    async fn test_requests_listed_newest_first_per_user() {
        let store = MemoryResearchStore::new();
        let user = Uuid::new_v4();

        let mut older = ResearchRequest::new("older", user, AiProvider::OpenAi);
        older.created_at = Utc::now() - chrono::Duration::minutes(5);
        let newer = ResearchRequest::new("newer", user, AiProvider::OpenAi);
        let other = ResearchRequest::new("other", Uuid::new_v4(), AiProvider::OpenAi);

        for r in [&older, &newer, &other] {
            store.create_request(r).await.unwrap();
        }

        let listed = store.list_requests_for_user(user).await.unwrap();
        let topics: Vec<&str> = listed.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, vec!["newer", "older"]);
    }
}
