//! LLM — multi-provider inference gateway.
//!
//! DESIGN
//! ======
//! Every verse carries its own `model_id`, so routing happens per request:
//! [`models::provider_for`] picks the provider and [`LlmClient`] forwards to
//! whichever client holds a key for it. Providers without a key stay `None`
//! and their models fail as unavailable instead of taking the server down.
//!
//! Inherited context is rendered into the system prompt; the verse's own
//! transcript goes out as the message list.

pub mod anthropic;
pub mod config;
pub mod models;
pub mod openai;
pub mod types;

use config::LlmConfig;
use models::LlmProviderKind;
pub use types::{CompletionRequest, GatewayError, InferenceGateway};
use types::{LlmError, Message, compose_system_prompt};

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete gateway that dispatches to Anthropic or OpenAI per model id.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    anthropic: Option<anthropic::AnthropicClient>,
    openai: Option<openai::OpenAiClient>,
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is set or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(&config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider HTTP client fails to build.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let anthropic = config
            .anthropic_api_key
            .clone()
            .map(|key| anthropic::AnthropicClient::new(key, config.timeouts))
            .transpose()?;
        let openai = config
            .openai_api_key
            .clone()
            .map(|key| openai::OpenAiClient::new(key, &config.openai_base_url, config.timeouts))
            .transpose()?;
        Ok(Self { anthropic, openai })
    }

    /// Providers with a configured key.
    #[must_use]
    pub fn providers(&self) -> Vec<LlmProviderKind> {
        let mut out = Vec::new();
        if self.anthropic.is_some() {
            out.push(LlmProviderKind::Anthropic);
        }
        if self.openai.is_some() {
            out.push(LlmProviderKind::OpenAi);
        }
        out
    }

    async fn complete_inner(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let provider =
            models::provider_for(request.model_id).ok_or_else(|| LlmError::UnknownModel(request.model_id.to_owned()))?;
        let system = compose_system_prompt(request.system_prompt, request.context);
        let messages: Vec<Message> = request.transcript.iter().map(Message::from).collect();

        match provider {
            LlmProviderKind::Anthropic => {
                let client = self
                    .anthropic
                    .as_ref()
                    .ok_or(LlmError::ProviderNotConfigured(provider.as_str()))?;
                client
                    .complete(request.model_id, request.max_tokens, &system, &messages)
                    .await
            }
            LlmProviderKind::OpenAi => {
                let client = self
                    .openai
                    .as_ref()
                    .ok_or(LlmError::ProviderNotConfigured(provider.as_str()))?;
                client
                    .complete(request.model_id, request.max_tokens, &system, &messages)
                    .await
            }
        }
    }
}

#[async_trait::async_trait]
impl InferenceGateway for LlmClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, GatewayError> {
        self.complete_inner(request).await.map_err(|e| {
            tracing::warn!(model = request.model_id, error = %e, "llm: completion failed");
            GatewayError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verse::{ContextTurn, Role};

    fn anthropic_only() -> LlmClient {
        let config = LlmConfig {
            anthropic_api_key: Some("test-key".into()),
            openai_api_key: None,
            openai_base_url: config::DEFAULT_OPENAI_BASE_URL.into(),
            timeouts: config::LlmTimeouts::default(),
        };
        LlmClient::from_config(&config).unwrap()
    }

    #[test]
    fn providers_lists_configured_clients() {
        assert_eq!(anthropic_only().providers(), vec![LlmProviderKind::Anthropic]);
    }

    #[tokio::test]
    async fn unconfigured_provider_is_unavailable() {
        let transcript = [ContextTurn { role: Role::User, content: "hi".into() }];
        let request = CompletionRequest {
            transcript: &transcript,
            context: None,
            system_prompt: "",
            model_id: "gpt-4o",
            max_tokens: 64,
        };
        let err = anthropic_only().complete(&request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[tokio::test]
    async fn unknown_model_is_invalid() {
        let request =
            CompletionRequest { transcript: &[], context: None, system_prompt: "", model_id: "mystery-1", max_tokens: 64 };
        let err = anthropic_only().complete(&request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Invalid(_)));
    }
}
