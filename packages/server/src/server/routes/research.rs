//! `/api/research`: submission and the owner-scoped read paths.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::domains::research::activities::{
    get_research_details, list_research as list_user_research, submit_research, ResearchDetails,
    SubmitResearchInput,
};
use crate::domains::research::models::ResearchRequest;
use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

/// POST /api/research
pub async fn create_research(
    Extension(state): Extension<AppState>,
    Json(input): Json<SubmitResearchInput>,
) -> ApiResult<(StatusCode, Json<ResearchRequest>)> {
    let request = submit_research(input, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/research?userId=
pub async fn list_research(
    Extension(state): Extension<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<ResearchRequest>>> {
    let requests = list_user_research(query.user_id.as_deref(), &state.deps).await?;
    Ok(Json(requests))
}

/// GET /api/research/:id?userId=
pub async fn get_research(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<ResearchDetails>> {
    let details = get_research_details(&id, query.user_id.as_deref(), &state.deps).await?;
    Ok(Json(details))
}
