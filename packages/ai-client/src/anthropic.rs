//! Anthropic Messages API client.
//!
//! Structured output is obtained by forcing a single tool call whose
//! `input_schema` is the requested schema; the tool input is returned as
//! the completion content.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AiError, Result};
use crate::types::{Completion, CompletionRequest, Message, SchemaSpec, Usage};
use crate::LlmProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic REST client.
#[derive(Clone)]
pub struct Anthropic {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl Anthropic {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http_client,
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
        }
    }

    /// Create from environment variable `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| AiError::Config("ANTHROPIC_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, body: &MessagesBody) -> Result<MessagesResponse> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Anthropic request failed");
                AiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Anthropic API error");
            return Err(AiError::Api(format!(
                "Anthropic API error {}: {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        debug!(
            model = %body.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Anthropic message"
        );

        Ok(parsed)
    }
}

#[async_trait]
impl LlmProvider for Anthropic {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let body = MessagesBody::from_request(&request, None);
        let response = self.send(&body).await?;

        let content = response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(AiError::Api("No text content from Anthropic".into()));
        }

        Ok(response.into_completion(content, &request.model))
    }

    async fn complete_structured(
        &self,
        request: CompletionRequest,
        schema: SchemaSpec,
    ) -> Result<Completion> {
        let tool_name = schema.name.clone();
        let body = MessagesBody::from_request(&request, Some(schema));
        let response = self.send(&body).await?;

        let input = response
            .content
            .iter()
            .find_map(|block| match block {
                ContentBlock::ToolUse { name, input } if *name == tool_name => Some(input),
                _ => None,
            })
            .ok_or_else(|| AiError::Api(format!("Anthropic did not call tool {}", tool_name)))?;

        let content = serde_json::to_string(input).map_err(|e| AiError::Parse(e.to_string()))?;

        Ok(response.into_completion(content, &request.model))
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct MessagesBody {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

impl MessagesBody {
    fn from_request(request: &CompletionRequest, schema: Option<SchemaSpec>) -> Self {
        let (tools, tool_choice) = match schema {
            Some(spec) => (
                vec![ToolDefinition {
                    name: spec.name.clone(),
                    description: format!("Record the response as a {} object", spec.name),
                    input_schema: spec.schema,
                }],
                Some(ToolChoice {
                    choice_type: "tool".to_string(),
                    name: spec.name,
                }),
            ),
            None => (Vec::new(), None),
        };

        Self {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            messages: vec![Message::user(request.prompt.clone())],
            temperature: request.temperature,
            tools,
            tool_choice,
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolDefinition {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    choice_type: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

impl MessagesResponse {
    fn into_completion(self, content: String, requested_model: &str) -> Completion {
        Completion {
            content,
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            usage: self
                .usage
                .map(|u| Usage::new(u.input_tokens, u.output_tokens)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_body_forces_tool() {
        let request = CompletionRequest::new("claude-3-5-sonnet-20241022", "Plan it");
        let schema = SchemaSpec::new("research_plan", serde_json::json!({"type": "object"}));
        let value = serde_json::to_value(MessagesBody::from_request(&request, Some(schema))).unwrap();

        assert_eq!(value["tools"][0]["name"], "research_plan");
        assert_eq!(value["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(value["tool_choice"]["type"], "tool");
        assert_eq!(value["tool_choice"]["name"], "research_plan");
        assert_eq!(value["max_tokens"], CompletionRequest::DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_system_prompt_is_top_level() {
        let request = CompletionRequest::new("claude-3-5-sonnet-20241022", "Hi").system("Be brief");
        let value = serde_json::to_value(MessagesBody::from_request(&request, None)).unwrap();

        assert_eq!(value["system"], "Be brief");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_parse_tool_use_response() {
        let response: MessagesResponse = serde_json::from_value(serde_json::json!({
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "text", "text": "Here you go"},
                {"type": "tool_use", "id": "toolu_1", "name": "research_plan", "input": {"researchDepth": "basic"}}
            ],
            "usage": {"input_tokens": 40, "output_tokens": 12}
        }))
        .unwrap();

        let input = response.content.iter().find_map(|b| match b {
            ContentBlock::ToolUse { input, .. } => Some(input.clone()),
            _ => None,
        });
        assert_eq!(input.unwrap()["researchDepth"], "basic");

        let completion = response.into_completion("{}".into(), "fallback");
        assert_eq!(completion.usage.unwrap().total_tokens, 52);
    }

    #[test]
    fn test_unknown_content_blocks_are_tolerated() {
        let response: MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": [{"type": "thinking", "thinking": "..."}]
        }))
        .unwrap();

        assert!(matches!(response.content[0], ContentBlock::Other));
        assert_eq!(response.into_completion(String::new(), "m").model, "m");
    }
}
