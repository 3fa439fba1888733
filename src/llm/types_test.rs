use super::*;
use crate::error::ErrorCode;

fn turn(role: Role, content: &str) -> ContextTurn {
    ContextTurn { role, content: content.into() }
}

// =============================================================================
// LlmError -> GatewayError
// =============================================================================

#[test]
fn auth_statuses_are_unauthorized() {
    for status in [401, 403] {
        let err = GatewayError::from(LlmError::ApiResponse { status, body: String::new() });
        assert!(matches!(err, GatewayError::Unauthorized(_)), "status {status}");
    }
}

#[test]
fn too_many_requests_is_rate_limited() {
    let err = GatewayError::from(LlmError::ApiResponse { status: 429, body: "slow down".into() });
    assert!(matches!(err, GatewayError::RateLimited(_)));
}

#[test]
fn server_errors_and_transport_are_unavailable() {
    for err in [
        LlmError::ApiResponse { status: 500, body: String::new() },
        LlmError::ApiResponse { status: 529, body: String::new() },
        LlmError::ApiRequest("connection reset".into()),
        LlmError::ProviderNotConfigured("openai"),
    ] {
        assert!(matches!(GatewayError::from(err), GatewayError::Unavailable(_)));
    }
}

#[test]
fn bad_requests_and_parse_failures_are_invalid() {
    for err in [
        LlmError::ApiResponse { status: 400, body: "bad".into() },
        LlmError::ApiResponse { status: 404, body: String::new() },
        LlmError::ApiParse("eof".into()),
        LlmError::UnknownModel("llama-9".into()),
    ] {
        assert!(matches!(GatewayError::from(err), GatewayError::Invalid(_)));
    }
}

#[test]
fn gateway_errors_are_never_retryable_at_this_layer() {
    let errors = [
        GatewayError::Unauthorized(String::new()),
        GatewayError::RateLimited(String::new()),
        GatewayError::Unavailable(String::new()),
        GatewayError::Invalid(String::new()),
    ];
    for err in errors {
        assert!(!err.retryable());
        assert!(err.error_code().starts_with("E_GATEWAY_"));
    }
}

#[test]
fn llm_error_retryable_matches_transient_statuses() {
    assert!(LlmError::ApiResponse { status: 503, body: String::new() }.retryable());
    assert!(LlmError::ApiRequest("timeout".into()).retryable());
    assert!(!LlmError::ApiResponse { status: 401, body: String::new() }.retryable());
    assert_eq!(LlmError::UnknownModel("x".into()).error_code(), "E_UNKNOWN_MODEL");
}

// =============================================================================
// compose_system_prompt
// =============================================================================

#[test]
fn no_context_leaves_prompt_alone() {
    assert_eq!(compose_system_prompt("be brief", None), "be brief");
    assert_eq!(compose_system_prompt("be brief", Some(&[])), "be brief");
}

#[test]
fn context_is_appended_in_order() {
    let context = [turn(Role::User, "hi"), turn(Role::Assistant, "hello")];
    let prompt = compose_system_prompt("be brief", Some(&context));

    assert!(prompt.starts_with("be brief\n\nConversation context from parent verses:"));
    let user_at = prompt.find("User: hi").unwrap();
    let assistant_at = prompt.find("Assistant: hello").unwrap();
    assert!(user_at < assistant_at);
}

#[test]
fn context_without_prompt_has_no_leading_blank_lines() {
    let context = [turn(Role::User, "hi")];
    let prompt = compose_system_prompt("", Some(&context));
    assert!(prompt.starts_with("Conversation context"));
}

#[test]
fn message_from_turn_uses_lowercase_role() {
    let message = Message::from(&turn(Role::Assistant, "ok"));
    assert_eq!(message, Message { role: "assistant".into(), content: "ok".into() });
}
