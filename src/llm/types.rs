//! LLM types — gateway contract, wire-neutral messages, and errors.
//!
//! DESIGN
//! ======
//! Two error layers. [`LlmError`] is what a provider client produces: transport
//! failures, non-200 statuses, unparseable bodies. [`GatewayError`] is the
//! four-way classification the verse services see. The conversion between
//! them is the only place HTTP status codes are interpreted.

use serde::{Deserialize, Serialize};

use crate::verse::{ContextTurn, Role};

// =============================================================================
// PROVIDER ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// No API key is configured for any provider.
    #[error("missing API key: none of {vars} is set")]
    MissingApiKey { vars: String },

    /// The model id is not served by any known provider.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// The model's provider has no API key configured.
    #[error("provider {0} is not configured")]
    ProviderNotConfigured(&'static str),

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The LLM provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::UnknownModel(_) => "E_UNKNOWN_MODEL",
            Self::ProviderNotConfigured(_) => "E_PROVIDER_NOT_CONFIGURED",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// GATEWAY ERROR
// =============================================================================

/// Classified inference failure, as seen by the chat and extraction services.
///
/// None of these are retried by the services; a failed turn is surfaced in the
/// transcript and the user decides whether to try again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl crate::error::ErrorCode for GatewayError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "E_GATEWAY_UNAUTHORIZED",
            Self::RateLimited(_) => "E_GATEWAY_RATE_LIMITED",
            Self::Unavailable(_) => "E_GATEWAY_UNAVAILABLE",
            Self::Invalid(_) => "E_GATEWAY_INVALID",
        }
    }
}

impl From<LlmError> for GatewayError {
    fn from(err: LlmError) -> Self {
        let message = err.to_string();
        match err {
            LlmError::ApiResponse { status: 401 | 403, .. } => Self::Unauthorized(message),
            LlmError::ApiResponse { status: 429, .. } => Self::RateLimited(message),
            LlmError::ApiResponse { status: 500..=599, .. }
            | LlmError::ApiRequest(_)
            | LlmError::HttpClientBuild(_)
            | LlmError::MissingApiKey { .. }
            | LlmError::ProviderNotConfigured(_) => Self::Unavailable(message),
            LlmError::ApiResponse { .. } | LlmError::ApiParse(_) | LlmError::UnknownModel(_) | LlmError::ConfigParse(_) => {
                Self::Invalid(message)
            }
        }
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// A single text message in a provider request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

impl From<&ContextTurn> for Message {
    fn from(turn: &ContextTurn) -> Self {
        Self { role: turn.role.as_str().to_owned(), content: turn.content.clone() }
    }
}

/// Render the inherited context as a block appended to the system prompt.
///
/// Returns `system_prompt` unchanged when there is no context.
#[must_use]
pub fn compose_system_prompt(system_prompt: &str, context: Option<&[ContextTurn]>) -> String {
    let Some(context) = context.filter(|turns| !turns.is_empty()) else {
        return system_prompt.to_owned();
    };

    let mut out = String::new();
    if !system_prompt.trim().is_empty() {
        out.push_str(system_prompt.trim_end());
        out.push_str("\n\n");
    }
    out.push_str("Conversation context from parent verses:\n");
    for turn in context {
        let speaker = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => continue,
        };
        out.push('\n');
        out.push_str(speaker);
        out.push_str(": ");
        out.push_str(&turn.content);
    }
    out
}

// =============================================================================
// GATEWAY CONTRACT
// =============================================================================

/// One completion request. `transcript` is the verse's own conversation,
/// `context` is what it inherited from its ancestors.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub transcript: &'a [ContextTurn],
    pub context: Option<&'a [ContextTurn]>,
    pub system_prompt: &'a str,
    pub model_id: &'a str,
    pub max_tokens: u32,
}

/// Provider-neutral async trait for text completion. Enables mocking in tests.
#[async_trait::async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Produce the assistant's reply text.
    ///
    /// # Errors
    ///
    /// Returns a classified [`GatewayError`]; callers surface it without retrying.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, GatewayError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
