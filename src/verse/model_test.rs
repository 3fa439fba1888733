use super::*;

#[test]
fn new_verse_is_root_with_chat_component() {
    let verse = Verse::new("gpt-4o");
    assert!(verse.is_root());
    assert!(verse.chat_history.is_empty());
    assert_eq!(verse.model_id, "gpt-4o");
    assert_eq!(verse.components.len(), 1);
    assert_eq!(verse.components[0].kind, ComponentKind::Chat);
    assert_eq!(verse.max_z_index(), 1);
}

#[test]
fn default_name_derives_from_id() {
    let verse = Verse::new("m");
    let hex = verse.id.0.simple().to_string();
    assert_eq!(verse.name, format!("Verse {}", &hex[..6]));
}

#[test]
fn seed_text_differs_by_branch_kind() {
    let whole = BranchKind::Verse.seed_text("Root");
    let message = BranchKind::Message.seed_text("Root");
    assert_ne!(whole, message);
    assert!(whole.contains("Root"));
    assert!(message.contains("specific message"));
}

#[test]
fn next_message_timestamp_never_goes_backwards() {
    let mut verse = Verse::new("m");
    let future = now_ms() + 60_000;
    verse.chat_history.push(ChatMessage {
        id: MessageId::new(),
        role: Role::User,
        content: "from the future".into(),
        timestamp: future,
    });
    let next = verse.next_message(Role::Assistant, "reply".into());
    assert_eq!(next.timestamp, future + 1);
}

#[test]
fn transcript_drops_system_messages() {
    let mut verse = Verse::new("m");
    for (role, content) in [(Role::System, "seed"), (Role::User, "hi"), (Role::Assistant, "hello")] {
        let message = verse.next_message(role, content.into());
        verse.chat_history.push(message);
    }
    let transcript = verse.transcript();
    assert_eq!(
        transcript,
        vec![
            ContextTurn { role: Role::User, content: "hi".into() },
            ContextTurn { role: Role::Assistant, content: "hello".into() },
        ]
    );
}

#[test]
fn verse_serializes_camel_case_and_skips_absent_artifacts() {
    let verse = Verse::new("m");
    let json = serde_json::to_value(&verse).unwrap();
    assert!(json.get("chatHistory").is_some());
    assert!(json.get("systemPrompt").is_some());
    assert!(json.get("boardCards").is_none());
    assert!(json.get("branchKind").is_none());
    assert_eq!(json["components"][0]["type"], "chat");
}

#[test]
fn verse_deserializes_with_defaults_and_ignores_legacy_branches() {
    let id = Uuid::new_v4();
    let json = serde_json::json!({
        "id": id,
        "name": "Legacy",
        "modelId": "claude-sonnet-4-5-20250929",
        "branches": ["not-a-real-id"],
    });
    let verse: Verse = serde_json::from_value(json).unwrap();
    assert_eq!(verse.id, VerseId(id));
    assert!(verse.parent_id.is_none());
    assert!(verse.chat_history.is_empty());
    assert_eq!(verse.size, DEFAULT_VERSE_SIZE);
}

#[test]
fn role_round_trips_lowercase() {
    assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    let role: Role = serde_json::from_str("\"system\"").unwrap();
    assert_eq!(role, Role::System);
}
