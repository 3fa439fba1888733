use super::*;

/// # Safety
/// Tests must run with `--test-threads=1` to avoid env races.
unsafe fn clear_llm_env() {
    unsafe {
        std::env::remove_var("LLM_ANTHROPIC_KEY_ENV");
        std::env::remove_var("LLM_OPENAI_KEY_ENV");
        std::env::remove_var("LLM_OPENAI_BASE_URL");
        std::env::remove_var("LLM_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("LLM_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("TEST_ANTHROPIC_KEY");
    }
}

#[test]
fn from_env_defaults_with_anthropic_key() {
    unsafe {
        clear_llm_env();
        std::env::set_var("ANTHROPIC_API_KEY", "secret");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.anthropic_api_key.as_deref(), Some("secret"));
    assert_eq!(cfg.openai_api_key, None);
    assert_eq!(cfg.openai_base_url, DEFAULT_OPENAI_BASE_URL);
    assert_eq!(cfg.timeouts, LlmTimeouts::default());

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_parses_overrides() {
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_ANTHROPIC_KEY_ENV", "TEST_ANTHROPIC_KEY");
        std::env::set_var("TEST_ANTHROPIC_KEY", "a-key");
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("LLM_OPENAI_BASE_URL", "https://example.test/v1/");
        std::env::set_var("LLM_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("LLM_CONNECT_TIMEOUT_SECS", "7");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.anthropic_api_key.as_deref(), Some("a-key"));
    assert_eq!(cfg.openai_api_key.as_deref(), Some("sk-test"));
    assert_eq!(cfg.openai_base_url, "https://example.test/v1");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_without_any_key_errors() {
    unsafe {
        clear_llm_env();
        std::env::set_var("OPENAI_API_KEY", "   ");
    }

    let err = LlmConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { .. }));
    assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_rejects_malformed_numbers() {
    unsafe {
        clear_llm_env();
        std::env::set_var("ANTHROPIC_API_KEY", "secret");
        std::env::set_var("LLM_REQUEST_TIMEOUT_SECS", "lots");
        std::env::set_var("LLM_CONNECT_TIMEOUT_SECS", "5");
    }

    let err = LlmConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("LLM_REQUEST_TIMEOUT_SECS"));

    unsafe { clear_llm_env() };
}
