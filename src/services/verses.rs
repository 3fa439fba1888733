//! Verse service — verse operations against a live canvas.
//!
//! Each call hydrates the canvas if needed, then runs one verse-core
//! operation under the canvas write lock. Successful writes mark the canvas
//! dirty; failed preconditions leave it untouched and clean.

use tracing::info;
use uuid::Uuid;

use super::canvas::{self, CanvasError};
use crate::state::AppState;
use crate::verse::{ContextTurn, MessageId, Point, Verse, VerseId, VerseOp};

/// Create a root verse on the canvas.
///
/// # Errors
///
/// Returns `NotFound` if the canvas cannot be loaded.
pub async fn create_root_verse(
    state: &AppState,
    canvas_id: Uuid,
    name: Option<&str>,
    model_id: Option<&str>,
    position: Point,
) -> Result<Verse, CanvasError> {
    canvas::ensure_loaded(state, canvas_id).await?;
    let default_model = state.config.default_model_id.clone();
    let verse = canvas::with_canvas_mut(state, canvas_id, |canvas| {
        let verse = canvas
            .document
            .verses
            .create_root(name, model_id, position, &default_model);
        canvas.touch();
        Ok(verse)
    })
    .await?;

    info!(%canvas_id, verse_id = %verse.id, "canvas: root verse created");
    Ok(verse)
}

/// Branch a verse, whole or from one of its messages.
///
/// # Errors
///
/// Returns `NotFound` for an unknown canvas, `VerseNotFound` for an unknown
/// parent, or `InvalidReference` when the message is not in the parent.
pub async fn create_branch(
    state: &AppState,
    canvas_id: Uuid,
    parent_id: VerseId,
    model_id: Option<&str>,
    source_message_id: Option<MessageId>,
) -> Result<Verse, CanvasError> {
    canvas::ensure_loaded(state, canvas_id).await?;
    let default_model = state.config.default_model_id.clone();
    let verse = canvas::with_canvas_mut(state, canvas_id, |canvas| {
        let verse = canvas
            .document
            .verses
            .create_branch(parent_id, model_id, source_message_id, &default_model)?;
        canvas.touch();
        Ok(verse)
    })
    .await?;

    info!(
        %canvas_id,
        %parent_id,
        verse_id = %verse.id,
        message_level = source_message_id.is_some(),
        "canvas: branch created"
    );
    Ok(verse)
}

/// Apply one mutation transaction and return the updated verse.
///
/// # Errors
///
/// Returns `NotFound` for an unknown canvas or the op's own error.
pub async fn apply_op(state: &AppState, canvas_id: Uuid, verse_id: VerseId, op: VerseOp) -> Result<Verse, CanvasError> {
    canvas::ensure_loaded(state, canvas_id).await?;
    let op_name = op.name();
    let verse = canvas::with_canvas_mut(state, canvas_id, |canvas| {
        canvas.document.verses.apply_in_place(verse_id, op)?;
        canvas.touch();
        Ok(canvas.document.verses.require(verse_id)?.clone())
    })
    .await?;

    tracing::debug!(%canvas_id, %verse_id, op = op_name, "canvas: verse updated");
    Ok(verse)
}

/// Remove a verse and its whole subtree. Returns every removed id.
///
/// Clears the active verse if it was removed. Replies still in flight for
/// removed verses are dropped when they arrive.
///
/// # Errors
///
/// Returns `NotFound` for an unknown canvas, or `VerseNotFound`.
pub async fn remove_verse(state: &AppState, canvas_id: Uuid, verse_id: VerseId) -> Result<Vec<VerseId>, CanvasError> {
    canvas::ensure_loaded(state, canvas_id).await?;
    let removed = canvas::with_canvas_mut(state, canvas_id, |canvas| {
        let removed = canvas.document.verses.remove_verse(verse_id)?;
        if canvas
            .document
            .active_verse_id
            .is_some_and(|active| removed.contains(&active))
        {
            canvas.document.active_verse_id = None;
        }
        canvas.touch();
        Ok(removed)
    })
    .await?;

    info!(%canvas_id, %verse_id, removed = removed.len(), "canvas: verse removed");
    Ok(removed)
}

/// The linear context a verse inherits from its ancestors.
///
/// # Errors
///
/// Returns `NotFound` for an unknown canvas, or `VerseNotFound`.
pub async fn verse_context(state: &AppState, canvas_id: Uuid, verse_id: VerseId) -> Result<Vec<ContextTurn>, CanvasError> {
    canvas::ensure_loaded(state, canvas_id).await?;
    canvas::with_canvas(state, canvas_id, |canvas| Ok(canvas.document.verses.assemble_context(verse_id)?)).await
}

#[cfg(test)]
#[path = "verses_test.rs"]
mod tests;
