//! `/api/ai`: standalone AI helpers outside the research pipeline.
//!
//! Calls made here carry no research request, so nothing is recorded to the
//! metrics sink.

use std::convert::Infallible;

use anyhow::Result;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{extract::Extension, Json};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::common::AiProvider;
use crate::domains::research::activities::{
    generate_keywords, generate_research_plan, parse_provider, validate_topic, AnalysisOptions,
};
use crate::domains::research::data::{Article, ResearchPlan};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct ResearchPlanInput {
    pub topic: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPlanResponse {
    pub topic: String,
    pub provider: AiProvider,
    pub plan: ResearchPlan,
    pub generated_at: DateTime<Utc>,
}

/// Article material for keyword extraction; only the title is required.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordArticle {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
}

impl From<KeywordArticle> for Article {
    fn from(a: KeywordArticle) -> Self {
        Article::new(a.title, a.summary, a.url, a.source)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct KeywordsInput {
    pub topic: Option<String>,
    #[serde(default)]
    pub articles: Vec<KeywordArticle>,
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordsResponse {
    pub topic: String,
    pub provider: AiProvider,
    pub keywords: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// POST /api/ai/research-plan
pub async fn research_plan(
    Extension(state): Extension<AppState>,
    Json(input): Json<ResearchPlanInput>,
) -> ApiResult<Json<ResearchPlanResponse>> {
    let topic = validate_topic(input.topic.as_deref())?;
    let provider = parse_provider(input.provider.as_deref())?;

    let plan = generate_research_plan(&topic, AnalysisOptions::new(provider), &state.deps)
        .await
        .map_err(|e| ApiError::or_failed(e, "Failed to generate research plan"))?;

    Ok(Json(ResearchPlanResponse {
        topic,
        provider,
        plan,
        generated_at: Utc::now(),
    }))
}

/// POST /api/ai/keywords
pub async fn keywords(
    Extension(state): Extension<AppState>,
    Json(input): Json<KeywordsInput>,
) -> ApiResult<Json<KeywordsResponse>> {
    let topic = validate_topic(input.topic.as_deref())?;
    let provider = parse_provider(input.provider.as_deref())?;
    let articles: Vec<Article> = input.articles.into_iter().map(Article::from).collect();

    let keywords = generate_keywords(&topic, &articles, AnalysisOptions::new(provider), &state.deps)
        .await
        .map_err(|e| ApiError::or_failed(e, "Failed to generate keywords"))?;

    Ok(Json(KeywordsResponse {
        topic,
        provider,
        keywords,
        generated_at: Utc::now(),
    }))
}

/// Terminal event of a successful analysis stream.
pub const STREAM_DONE: &str = "[DONE]";

/// POST /api/ai/stream-analysis
///
/// Streams a research plan as growing partial objects, one `data:` event per
/// field, then `[DONE]`. Input is validated before the stream opens; a
/// generation failure becomes a single error event.
pub async fn stream_analysis(
    Extension(state): Extension<AppState>,
    Json(input): Json<ResearchPlanInput>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let topic = validate_topic(input.topic.as_deref())?;
    let provider = parse_provider(input.provider.as_deref())?;
    let deps = state.deps.clone();

    let events = stream::once(async move {
        generate_research_plan(&topic, AnalysisOptions::new(provider), &deps).await
    })
    .flat_map(|plan| stream::iter(analysis_events(plan).into_iter().map(Ok)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn analysis_events(plan: Result<ResearchPlan>) -> Vec<Event> {
    let fields = match plan.and_then(|plan| Ok(serde_json::to_value(plan)?)) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            return vec![
                Event::default().data(other.to_string()),
                Event::default().data(STREAM_DONE),
            ]
        }
        Err(e) => {
            warn!(error = %e, "stream analysis failed");
            return vec![Event::default()
                .data(json!({ "error": "Failed to generate analysis" }).to_string())];
        }
    };

    let mut partial = Map::new();
    let mut events: Vec<Event> = fields
        .into_iter()
        .map(|(key, value)| {
            partial.insert(key, value);
            Event::default().data(Value::Object(partial.clone()).to_string())
        })
        .collect();
    events.push(Event::default().data(STREAM_DONE));
    events
}
