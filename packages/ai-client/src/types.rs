//! Provider-neutral request and response types.

use serde::{Deserialize, Serialize};

// =============================================================================
// Messages
// =============================================================================

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

// =============================================================================
// Completions
// =============================================================================

/// A prompt sent to any provider.
///
/// Providers translate this into their own wire format.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Default completion budget; Anthropic requires an explicit value.
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;

    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the system prompt.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max completion tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub(crate) fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(self.prompt.clone()));
        messages
    }
}

/// A JSON schema the response must conform to.
#[derive(Debug, Clone)]
pub struct SchemaSpec {
    /// Schema name (`^[a-zA-Z0-9_-]+$`)
    pub name: String,
    pub schema: serde_json::Value,
}

impl SchemaSpec {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Completion returned by a provider.
///
/// For structured requests `content` is the raw JSON document.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    /// Model that actually served the request
    pub model: String,
    pub usage: Option<Usage>,
}

/// Token usage statistics, normalized across providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Total tokens used
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

// =============================================================================
// Utilities
// =============================================================================

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("You are helpful").role, "system");
        assert_eq!(Message::user("Hello").role, "user");
        assert_eq!(Message::assistant("Hi there").role, "assistant");
    }

    #[test]
    fn test_completion_request_builder() {
        let req = CompletionRequest::new("gpt-4o", "Hello")
            .system("Be brief")
            .temperature(0.2)
            .max_tokens(100);

        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.temperature, Some(0.2));
        assert_eq!(req.max_tokens, 100);

        let messages = req.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "Hello");
    }

    #[test]
    fn test_messages_without_system_prompt() {
        let req = CompletionRequest::new("gpt-4o", "Hello");
        assert_eq!(req.messages().len(), 1);
    }

    #[test]
    fn test_usage_totals() {
        let usage = Usage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }
}
