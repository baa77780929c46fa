//! Read paths for research requests, scoped to their owner.

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use super::aggregate_logs::aggregate;
use crate::domains::research::errors::{ResearchAccessDenied, ResearchNotFound, ValidationError};
use crate::domains::research::models::{ResearchRequest, ResearchResult, WorkflowLog};
use crate::kernel::ServerDeps;

/// A request with its aggregated timeline and result, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchDetails {
    pub request: ResearchRequest,
    pub logs: Vec<WorkflowLog>,
    pub result: Option<ResearchResult>,
}

/// Parse the `userId` query parameter.
pub fn parse_user_id(user_id: Option<&str>) -> Result<Uuid, ValidationError> {
    user_id
        .and_then(|id| Uuid::parse_str(id.trim()).ok())
        .ok_or(ValidationError::MissingUserIdParam)
}

/// Requests owned by `user_id`, newest first.
pub async fn list_research(user_id: Option<&str>, deps: &ServerDeps) -> Result<Vec<ResearchRequest>> {
    let user_id = parse_user_id(user_id)?;
    deps.store.list_requests_for_user(user_id).await
}

/// One request with its aggregated log and result.
///
/// Ids that are not UUIDs are treated as unknown requests.
pub async fn get_research_details(
    id: &str,
    user_id: Option<&str>,
    deps: &ServerDeps,
) -> Result<ResearchDetails> {
    let user_id = parse_user_id(user_id)?;
    let id = Uuid::parse_str(id.trim()).map_err(|_| ResearchNotFound(Uuid::nil()))?;

    let request = deps
        .store
        .find_request(id)
        .await?
        .ok_or(ResearchNotFound(id))?;

    if request.user_id != user_id {
        return Err(ResearchAccessDenied {
            request_id: id,
            user_id,
        }
        .into());
    }

    let logs = aggregate(deps.store.list_logs(id).await?);
    let result = deps.store.find_result(id).await?;

    Ok(ResearchDetails {
        request,
        logs,
        result,
    })
}
