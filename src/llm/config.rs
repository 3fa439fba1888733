//! LLM configuration parsed from environment variables.

use super::types::LlmError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

const DEFAULT_ANTHROPIC_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const DEFAULT_OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for LlmTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    }
}

/// Keys for every provider that has one. A verse whose model belongs to a
/// provider without a key fails its turns as unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// At least one of:
    /// - `ANTHROPIC_API_KEY` (name overridable with `LLM_ANTHROPIC_KEY_ENV`)
    /// - `OPENAI_API_KEY` (name overridable with `LLM_OPENAI_KEY_ENV`)
    ///
    /// Optional:
    /// - `LLM_OPENAI_BASE_URL`: default OpenAI API base URL
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when no provider key is set, or
    /// [`LlmError::ConfigParse`] for a malformed numeric setting.
    pub fn from_env() -> Result<Self, LlmError> {
        let anthropic_var = key_env_name("LLM_ANTHROPIC_KEY_ENV", DEFAULT_ANTHROPIC_KEY_ENV);
        let openai_var = key_env_name("LLM_OPENAI_KEY_ENV", DEFAULT_OPENAI_KEY_ENV);
        let anthropic_api_key = non_empty_var(&anthropic_var);
        let openai_api_key = non_empty_var(&openai_var);

        if anthropic_api_key.is_none() && openai_api_key.is_none() {
            return Err(LlmError::MissingApiKey { vars: format!("{anthropic_var}, {openai_var}") });
        }

        let openai_base_url = std::env::var("LLM_OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = LlmTimeouts {
            request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS)?,
        };
        Ok(Self { anthropic_api_key, openai_api_key, openai_base_url, timeouts })
    }
}

fn key_env_name(override_var: &str, default: &str) -> String {
    std::env::var(override_var).unwrap_or_else(|_| default.to_string())
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, LlmError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| LlmError::ConfigParse(format!("{key} has invalid value {raw:?}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
