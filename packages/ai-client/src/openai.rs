//! OpenAI chat completions client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AiError, Result};
use crate::types::{Completion, CompletionRequest, Message, SchemaSpec, Usage};
use crate::LlmProvider;

/// OpenAI REST client.
#[derive(Clone)]
pub struct OpenAi {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAi {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http_client,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AiError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, body: &ChatCompletionBody) -> Result<Completion> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                AiError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(AiError::Api(format!("OpenAI API error {}: {}", status, error_text)));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::Api("No response from OpenAI".into()))?;

        debug!(
            model = %body.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI chat completion"
        );

        Ok(Completion {
            content,
            model: raw.model.unwrap_or_else(|| body.model.clone()),
            usage: raw
                .usage
                .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAi {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let body = ChatCompletionBody::from_request(&request, None);
        self.send(&body).await
    }

    async fn complete_structured(
        &self,
        request: CompletionRequest,
        schema: SchemaSpec,
    ) -> Result<Completion> {
        let body = ChatCompletionBody::from_request(&request, Some(schema));
        self.send(&body).await
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionBody {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

impl ChatCompletionBody {
    fn from_request(request: &CompletionRequest, schema: Option<SchemaSpec>) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: schema.map(|spec| ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: spec.name,
                    strict: true,
                    schema: spec.schema,
                },
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAi::new("sk-test").with_base_url("https://custom.api.com");

        assert_eq!(client.api_key, "sk-test");
        assert_eq!(client.base_url(), "https://custom.api.com");
    }

    #[test]
    fn test_structured_body_uses_strict_json_schema() {
        let request = CompletionRequest::new("gpt-4o", "Plan it").temperature(0.0);
        let schema = SchemaSpec::new("plan", serde_json::json!({"type": "object"}));
        let body = ChatCompletionBody::from_request(&request, Some(schema));
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(value["response_format"]["json_schema"]["name"], "plan");
        assert_eq!(value["response_format"]["json_schema"]["strict"], true);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_plain_body_omits_response_format() {
        let request = CompletionRequest::new("gpt-4o", "Hello");
        let body = ChatCompletionBody::from_request(&request, None);
        let value = serde_json::to_value(&body).unwrap();

        assert!(value.get("response_format").is_none());
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_parse_response_with_usage() {
        let raw: ChatResponseRaw = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o-2024-08-06",
            "choices": [{"message": {"role": "assistant", "content": "hi"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }))
        .unwrap();

        assert_eq!(raw.choices[0].message.content.as_deref(), Some("hi"));
        assert_eq!(raw.usage.unwrap().completion_tokens, 2);
    }
}
