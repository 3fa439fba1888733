use super::*;
use crate::error::ErrorCode;
use crate::state::test_helpers;
use crate::verse::{Role, VerseError};

async fn dirty_and_revision(state: &AppState, canvas_id: Uuid) -> (bool, u64) {
    let canvases = state.canvases.read().await;
    let canvas = &canvases[&canvas_id];
    (canvas.dirty, canvas.revision)
}

#[tokio::test]
async fn create_root_uses_configured_default_model() {
    let state = test_helpers::test_app_state();
    let (canvas_id, _) = test_helpers::seed_canvas(&state).await;

    let verse = create_root_verse(&state, canvas_id, Some("Second"), None, Point::new(500.0, 0.0))
        .await
        .unwrap();
    assert_eq!(verse.name, "Second");
    assert_eq!(verse.model_id, state.config.default_model_id);
    assert_eq!(dirty_and_revision(&state, canvas_id).await, (true, 1));
}

#[tokio::test]
async fn branch_then_context_reflects_parent_history() {
    let state = test_helpers::test_app_state();
    let (canvas_id, root) = test_helpers::seed_canvas(&state).await;
    let op = VerseOp::AppendMessage { role: Role::User, content: "hi".into() };
    apply_op(&state, canvas_id, root, op).await.unwrap();

    let child = create_branch(&state, canvas_id, root, None, None).await.unwrap();
    let context = verse_context(&state, canvas_id, child.id).await.unwrap();
    assert_eq!(context, vec![ContextTurn { role: Role::User, content: "hi".into() }]);
}

#[tokio::test]
async fn failed_branch_leaves_canvas_clean() {
    let state = test_helpers::test_app_state();
    let (canvas_id, root) = test_helpers::seed_canvas(&state).await;

    let err = create_branch(&state, canvas_id, root, None, Some(MessageId::new()))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "E_INVALID_REFERENCE");
    assert_eq!(dirty_and_revision(&state, canvas_id).await, (false, 0));
}

#[tokio::test]
async fn apply_op_returns_updated_verse() {
    let state = test_helpers::test_app_state();
    let (canvas_id, root) = test_helpers::seed_canvas(&state).await;

    let verse = apply_op(&state, canvas_id, root, VerseOp::SetName { name: "Renamed".into() })
        .await
        .unwrap();
    assert_eq!(verse.name, "Renamed");
}

#[tokio::test]
async fn remove_clears_active_verse_when_it_goes_with_the_subtree() {
    let state = test_helpers::test_app_state();
    let (canvas_id, root) = test_helpers::seed_canvas(&state).await;
    let child = create_branch(&state, canvas_id, root, None, None).await.unwrap();
    canvas::set_active_verse(&state, canvas_id, Some(child.id)).await.unwrap();

    let removed = remove_verse(&state, canvas_id, root).await.unwrap();
    assert_eq!(removed, vec![root, child.id]);

    let doc = canvas::get_canvas(&state, canvas_id).await.unwrap();
    assert!(doc.verses.is_empty());
    assert_eq!(doc.active_verse_id, None);

    let err = verse_context(&state, canvas_id, child.id).await.unwrap_err();
    assert!(matches!(err, CanvasError::Verse(VerseError::VerseNotFound(_))));
}

#[tokio::test]
async fn remove_keeps_active_verse_outside_the_subtree() {
    let state = test_helpers::test_app_state();
    let (canvas_id, root) = test_helpers::seed_canvas(&state).await;
    let child = create_branch(&state, canvas_id, root, None, None).await.unwrap();

    remove_verse(&state, canvas_id, child.id).await.unwrap();
    let doc = canvas::get_canvas(&state, canvas_id).await.unwrap();
    assert_eq!(doc.active_verse_id, Some(root));
}
