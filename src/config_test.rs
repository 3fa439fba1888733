use std::collections::HashMap;

use super::*;

fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    ServerConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn defaults_apply_when_only_database_url_is_set() {
    let cfg = config_from(&[("DATABASE_URL", "postgres://localhost/canvas")]).unwrap();
    assert_eq!(cfg.database_url, "postgres://localhost/canvas");
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(cfg.shared_secret, None);
    assert_eq!(cfg.flush_interval_ms, DEFAULT_CANVAS_FLUSH_INTERVAL_MS);
    assert_eq!(cfg.default_model_id, DEFAULT_MODEL_ID);
    assert_eq!(cfg.max_tokens, DEFAULT_LLM_MAX_TOKENS);
}

#[test]
fn overrides_are_parsed() {
    let cfg = config_from(&[
        ("DATABASE_URL", "postgres://db/canvas"),
        ("PORT", "8080"),
        ("DB_MAX_CONNECTIONS", "12"),
        ("CANVAS_SHARED_SECRET", "hunter2"),
        ("CANVAS_FLUSH_INTERVAL_MS", " 250 "),
        ("DEFAULT_MODEL_ID", "gpt-4o"),
        ("LLM_MAX_TOKENS", "2048"),
    ])
    .unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.db_max_connections, 12);
    assert_eq!(cfg.shared_secret.as_deref(), Some("hunter2"));
    assert_eq!(cfg.flush_interval_ms, 250);
    assert_eq!(cfg.default_model_id, "gpt-4o");
    assert_eq!(cfg.max_tokens, 2048);
}

#[test]
fn missing_database_url_is_an_error() {
    let err = config_from(&[("PORT", "8080")]).unwrap_err();
    assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
}

#[test]
fn blank_secret_means_no_auth() {
    let cfg = config_from(&[("DATABASE_URL", "postgres://x"), ("CANVAS_SHARED_SECRET", "  ")]).unwrap();
    assert_eq!(cfg.shared_secret, None);
}

#[test]
fn malformed_number_names_the_key() {
    let err = config_from(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")]).unwrap_err();
    assert_eq!(err.to_string(), "PORT has invalid value \"eighty\"");
}

#[test]
fn debug_output_redacts_secret() {
    let cfg = config_from(&[("DATABASE_URL", "postgres://user:pw@x"), ("CANVAS_SHARED_SECRET", "hunter2")]).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("pw@x"));
}
