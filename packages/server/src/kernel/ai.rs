//! BaseAI implementation over the ai-client providers.

use std::sync::Arc;

use ai_client::{Anthropic, CompletionRequest, LlmProvider, OpenAi, SchemaSpec};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{AiCompletion, BaseAI};
use crate::common::AiProvider;

/// Routes each call to the client configured for the requested provider.
///
/// A provider without an API key is simply absent; calls for it fail.
#[derive(Clone, Default)]
pub struct ProviderAI {
    openai: Option<Arc<dyn LlmProvider>>,
    anthropic: Option<Arc<dyn LlmProvider>>,
}

impl ProviderAI {
    pub fn new(openai_api_key: Option<String>, anthropic_api_key: Option<String>) -> Self {
        Self {
            openai: openai_api_key.map(|key| Arc::new(OpenAi::new(key)) as Arc<dyn LlmProvider>),
            anthropic: anthropic_api_key
                .map(|key| Arc::new(Anthropic::new(key)) as Arc<dyn LlmProvider>),
        }
    }

    /// Use explicit clients (custom base URLs, fakes).
    pub fn with_clients(
        openai: Option<Arc<dyn LlmProvider>>,
        anthropic: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        Self { openai, anthropic }
    }

    /// Providers with credentials configured.
    pub fn configured_providers(&self) -> Vec<AiProvider> {
        AiProvider::ALL
            .into_iter()
            .filter(|p| self.client(*p).is_ok())
            .collect()
    }

    fn client(&self, provider: AiProvider) -> Result<&Arc<dyn LlmProvider>> {
        let client = match provider {
            AiProvider::OpenAi => self.openai.as_ref(),
            AiProvider::Anthropic => self.anthropic.as_ref(),
        };
        client.ok_or_else(|| anyhow!("AI provider {} is not configured", provider))
    }

    fn into_completion(provider: AiProvider, completion: ai_client::Completion) -> AiCompletion {
        debug!(
            provider = %provider,
            served_by = %completion.model,
            "AI completion received"
        );
        AiCompletion {
            content: completion.content,
            // Billing is keyed on the requested model, not the dated snapshot
            model: provider.model_name().to_string(),
            usage: completion.usage.map(Into::into),
        }
    }
}

#[async_trait]
impl BaseAI for ProviderAI {
    async fn generate_text(&self, provider: AiProvider, prompt: &str) -> Result<AiCompletion> {
        let request = CompletionRequest::new(provider.model_name(), prompt);
        let completion = self.client(provider)?.complete(request).await?;
        Ok(Self::into_completion(provider, completion))
    }

    async fn generate_structured(
        &self,
        provider: AiProvider,
        prompt: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<AiCompletion> {
        let request = CompletionRequest::new(provider.model_name(), prompt).temperature(0.0);
        let completion = self
            .client(provider)?
            .complete_structured(request, SchemaSpec::new(schema_name, schema))
            .await?;
        Ok(Self::into_completion(provider, completion))
    }
}
