// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Ranking, fallback and normalization live in the research domain and use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseArticleSource)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::{AiMetrics, AiProvider, TokenUsage};

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

/// Raw output of one AI call.
#[derive(Debug, Clone)]
pub struct AiCompletion {
    /// Text, or the JSON document for structured calls
    pub content: String,
    /// Model the call was billed against
    pub model: String,
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Generate free text from a prompt
    async fn generate_text(&self, provider: AiProvider, prompt: &str) -> Result<AiCompletion>;

    /// Generate a JSON document conforming to `schema`
    /// Parse and validate in calling code
    async fn generate_structured(
        &self,
        provider: AiProvider,
        prompt: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<AiCompletion>;
}

// =============================================================================
// Article Source Trait (Infrastructure - external content providers)
// =============================================================================

/// An article as returned by a source, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleCandidate {
    pub title: Option<String>,
    pub url: Option<String>,
    pub summary: String,
    pub source: String,
}

#[async_trait]
pub trait BaseArticleSource: Send + Sync {
    /// Display name used in logs and error messages
    fn name(&self) -> &str;

    /// Fetch candidate articles for a topic
    async fn fetch(&self, topic: &str) -> Result<Vec<ArticleCandidate>>;
}

// =============================================================================
// Metrics Sink Trait (Infrastructure - AI usage accounting)
// =============================================================================

#[async_trait]
pub trait BaseMetricsSink: Send + Sync {
    /// Append one record
    async fn record(&self, metrics: AiMetrics) -> Result<()>;

    /// All records for a research request, oldest first
    async fn for_request(&self, request_id: Uuid) -> Result<Vec<AiMetrics>>;

    /// Records with `start <= timestamp <= end`, oldest first
    async fn in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<AiMetrics>>;

    /// Newest `limit` records, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<AiMetrics>>;

    /// Everything retained, oldest first
    async fn export(&self) -> Result<Vec<AiMetrics>>;
}
