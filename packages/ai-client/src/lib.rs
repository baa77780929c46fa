//! Provider-agnostic AI client
//!
//! One capability surface ("complete a prompt", "complete a prompt into a
//! JSON schema") over OpenAI chat completions and Anthropic messages.
//!
//! ```rust,ignore
//! use ai_client::{extract, Anthropic, CompletionRequest};
//!
//! let client = Anthropic::from_env()?;
//! let (plan, completion) = extract::<Plan>(
//!     &client,
//!     CompletionRequest::new("claude-3-5-sonnet-20241022", "Plan research on Rust"),
//! )
//! .await?;
//! ```

pub mod anthropic;
pub mod error;
pub mod openai;
pub mod schema;
pub mod types;

pub use anthropic::Anthropic;
pub use error::{AiError, Result};
pub use openai::OpenAi;
pub use schema::StructuredOutput;
pub use types::*;

use async_trait::async_trait;

/// A generative model provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider identifier ("openai", "anthropic").
    fn name(&self) -> &'static str;

    /// Free text completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    /// Completion constrained to `schema`; `content` holds the JSON document.
    async fn complete_structured(
        &self,
        request: CompletionRequest,
        schema: SchemaSpec,
    ) -> Result<Completion>;
}

/// Type-safe structured extraction through any provider.
pub async fn extract<T: StructuredOutput>(
    provider: &dyn LlmProvider,
    request: CompletionRequest,
) -> Result<(T, Completion)> {
    let completion = provider.complete_structured(request, T::schema_spec()).await?;

    let value = serde_json::from_str(strip_code_blocks(&completion.content))
        .map_err(|e| AiError::Parse(format!("Failed to deserialize response: {}", e)))?;

    Ok((value, completion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    struct CannedProvider(&'static str);

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
            Ok(Completion {
                content: self.0.to_string(),
                model: request.model,
                usage: Some(Usage::new(3, 4)),
            })
        }

        async fn complete_structured(
            &self,
            request: CompletionRequest,
            _schema: SchemaSpec,
        ) -> Result<Completion> {
            self.complete(request).await
        }
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Verdict {
        score: f64,
    }

    #[tokio::test]
    async fn test_extract_deserializes_fenced_json() {
        let provider = CannedProvider("```json\n{\"score\": 7.5}\n```");
        let (verdict, completion) =
            extract::<Verdict>(&provider, CompletionRequest::new("m", "rate it"))
                .await
                .unwrap();

        assert_eq!(verdict.score, 7.5);
        assert_eq!(completion.usage.unwrap().total_tokens, 7);
    }

    #[tokio::test]
    async fn test_extract_reports_parse_errors() {
        let provider = CannedProvider("not json");
        let err = extract::<Verdict>(&provider, CompletionRequest::new("m", "rate it"))
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::Parse(_)));
    }
}
