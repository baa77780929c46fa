//! Server dependencies for activities (using traits for testability)
//!
//! This module provides the central dependency container used by all domain
//! activities and job handlers. Every external service sits behind a trait.

use std::sync::Arc;

use anyhow::Result;

use super::jobs::JobQueue;
use super::{BaseAI, BaseArticleSource, BaseMetricsSink, HackerNewsClient, NewsApiClient, WikipediaClient};
use crate::domains::research::store::ResearchStore;

/// Server dependencies accessible to activities
#[derive(Clone)]
pub struct ServerDeps {
    /// AI capability, routed per call to the selected provider
    pub ai: Arc<dyn BaseAI>,
    /// Article sources in fallback priority order
    pub sources: Vec<Arc<dyn BaseArticleSource>>,
    /// AI usage/cost accounting sink
    pub metrics: Arc<dyn BaseMetricsSink>,
    pub store: Arc<dyn ResearchStore>,
    pub jobs: Arc<dyn JobQueue>,
}

impl ServerDeps {
    pub fn new(
        ai: Arc<dyn BaseAI>,
        sources: Vec<Arc<dyn BaseArticleSource>>,
        metrics: Arc<dyn BaseMetricsSink>,
        store: Arc<dyn ResearchStore>,
        jobs: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            ai,
            sources,
            metrics,
            store,
            jobs,
        }
    }
}

/// The production source chain: NewsAPI, then Hacker News, then Wikipedia.
pub fn default_sources(news_api_key: Option<String>) -> Result<Vec<Arc<dyn BaseArticleSource>>> {
    Ok(vec![
        Arc::new(NewsApiClient::new(news_api_key)?),
        Arc::new(HackerNewsClient::new()?),
        Arc::new(WikipediaClient::new()?),
    ])
}
