// Common types used across multiple domains and layers
//
// These types are shared between the kernel and domain layers to avoid
// circular dependencies while maintaining type safety.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// Generative AI provider backing a research request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "ai_provider", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    OpenAi,
    #[default]
    Anthropic,
}

impl AiProvider {
    pub const ALL: [AiProvider; 2] = [AiProvider::OpenAi, AiProvider::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
        }
    }

    /// Model used for every call made on behalf of this provider.
    pub fn model_name(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "gpt-4o",
            AiProvider::Anthropic => "claude-3-5-sonnet-20241022",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Provider must be either 'openai' or 'anthropic'")]
pub struct UnknownProvider(pub String);

impl FromStr for AiProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "openai" => Ok(AiProvider::OpenAi),
            "anthropic" => Ok(AiProvider::Anthropic),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Token counts reported by a provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

impl From<ai_client::Usage> for TokenUsage {
    fn from(usage: ai_client::Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens as u64,
            completion_tokens: usage.completion_tokens as u64,
            total_tokens: usage.total_tokens as u64,
        }
    }
}

/// One recorded AI invocation: tokens, cost and latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(setter(into)))]
pub struct AiMetrics {
    pub request_id: Uuid,
    pub provider: AiProvider,
    pub model: String,
    /// Operation name, e.g. "analyze-article"
    pub operation: String,
    #[builder(default)]
    pub token_usage: TokenUsage,
    /// USD
    #[builder(default)]
    pub cost: f64,
    /// Milliseconds
    #[serde(rename = "duration")]
    #[builder(default)]
    pub duration_ms: u64,
    #[builder(default = Utc::now())]
    pub timestamp: DateTime<Utc>,
    #[builder(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
