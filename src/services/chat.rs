//! Chat service — one user turn against a verse's model.
//!
//! DESIGN
//! ======
//! A turn has three phases. Under the canvas write lock: append the user
//! message, mark the verse pending, and snapshot transcript, inherited
//! context, system prompt, and model. With the lock released: call the
//! gateway. Under the lock again: append the reply, clear pending.
//!
//! The gateway call is the only suspension point, so turns on different
//! verses run in parallel while a verse never has two calls in flight.
//! The last two phases run on a spawned task that owns a clone of the
//! state. A caller that stops waiting does not stop the turn: the reply
//! still lands and pending is still cleared.
//!
//! ERROR HANDLING
//! ==============
//! Gateway failures are not errors of `send_turn`. They land in the
//! transcript as an assistant-role entry and the verse stays usable. If the
//! verse was removed while its call was in flight there is nowhere to put
//! the reply, so it is dropped with a warning.

use tracing::{error, info, warn};
use uuid::Uuid;

use super::canvas::{self, CanvasError};
use crate::error::ErrorCode;
use crate::llm::{CompletionRequest, GatewayError};
use crate::state::AppState;
use crate::verse::{ChatMessage, ContextTurn, Role, VerseId};

/// Prefix marking an assistant entry that reports a failed call.
pub const ERROR_ENTRY_PREFIX: &str = "⚠️";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("verse {0} already has a reply in flight")]
    TurnInFlight(VerseId),
    #[error("turn task failed: {0}")]
    TaskFailed(String),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::TurnInFlight(_) => "E_TURN_IN_FLIGHT",
            Self::TaskFailed(_) => "E_TURN_FAILED",
            Self::Canvas(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::TurnInFlight(_) | Self::TaskFailed(_)) || matches!(self, Self::Canvas(e) if e.retryable())
    }
}

/// What a turn appended. `reply` is the assistant message, or the error
/// entry when `error` is set; it is `None` only if the verse was removed
/// before the call finished.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub user_message: ChatMessage,
    pub reply: Option<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GatewayErrorBody>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GatewayErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<&GatewayError> for GatewayErrorBody {
    fn from(err: &GatewayError) -> Self {
        Self { code: err.error_code(), message: err.to_string() }
    }
}

struct TurnSnapshot {
    transcript: Vec<ContextTurn>,
    context: Vec<ContextTurn>,
    system_prompt: String,
    model_id: String,
}

// =============================================================================
// TURN
// =============================================================================

/// Send one user message and wait for the reply.
///
/// # Errors
///
/// Returns `EmptyMessage`, `TurnInFlight` when the verse is still waiting on
/// a previous turn, a canvas/verse lookup error, or `TaskFailed` if the
/// reply task panicked (pending is cleared first). Gateway failures are not
/// returned here; see [`TurnOutcome::error`].
pub async fn send_turn(
    state: &AppState,
    canvas_id: Uuid,
    verse_id: VerseId,
    content: &str,
) -> Result<TurnOutcome, ChatError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    canvas::ensure_loaded(state, canvas_id).await?;

    // PHASE: APPEND + SNAPSHOT UNDER LOCK
    let (user_message, snapshot) = {
        let mut canvases = state.canvases.write().await;
        let canvas = canvases
            .get_mut(&canvas_id)
            .ok_or(CanvasError::NotFound(canvas_id))?;
        canvas
            .document
            .verses
            .require(verse_id)
            .map_err(CanvasError::from)?;
        if canvas.pending.contains(&verse_id) {
            return Err(ChatError::TurnInFlight(verse_id));
        }

        let verses = &mut canvas.document.verses;
        let user_message = verses
            .append_message(verse_id, Role::User, content)
            .map_err(CanvasError::from)?;
        let context = verses
            .assemble_context(verse_id)
            .map_err(CanvasError::from)?;
        let verse = verses.require(verse_id).map_err(CanvasError::from)?;
        let snapshot = TurnSnapshot {
            transcript: verse.transcript(),
            context,
            system_prompt: verse.system_prompt.clone(),
            model_id: verse.model_id.clone(),
        };

        canvas.pending.insert(verse_id);
        canvas.touch();
        (user_message, snapshot)
    };

    info!(
        %canvas_id,
        %verse_id,
        model = %snapshot.model_id,
        turns = snapshot.transcript.len(),
        context_turns = snapshot.context.len(),
        "chat: turn started"
    );

    // PHASE: GATEWAY CALL + REPLY, DETACHED
    // Outlives the caller: a dropped handler future still completes the turn.
    let task = tokio::spawn(finish_turn(state.clone(), canvas_id, verse_id, user_message, snapshot));
    match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(%canvas_id, %verse_id, error = %e, "chat: turn task failed");
            release_pending(state, canvas_id, verse_id).await;
            Err(ChatError::TaskFailed(e.to_string()))
        }
    }
}

async fn finish_turn(
    state: AppState,
    canvas_id: Uuid,
    verse_id: VerseId,
    user_message: ChatMessage,
    snapshot: TurnSnapshot,
) -> Result<TurnOutcome, ChatError> {
    let result = match &state.llm {
        Some(llm) => {
            let request = CompletionRequest {
                transcript: &snapshot.transcript,
                context: (!snapshot.context.is_empty()).then_some(snapshot.context.as_slice()),
                system_prompt: &snapshot.system_prompt,
                model_id: &snapshot.model_id,
                max_tokens: state.config.max_tokens,
            };
            llm.complete(&request).await
        }
        None => Err(GatewayError::Unavailable("no inference provider is configured".into())),
    };

    // PHASE: APPEND REPLY, CLEAR PENDING
    let mut canvases = state.canvases.write().await;
    let Some(canvas) = canvases.get_mut(&canvas_id) else {
        warn!(%canvas_id, %verse_id, "chat: canvas closed before reply arrived; reply dropped");
        return Ok(TurnOutcome { user_message, reply: None, error: result.err().as_ref().map(Into::into) });
    };
    canvas.pending.remove(&verse_id);

    if !canvas.document.verses.contains(verse_id) {
        warn!(%canvas_id, %verse_id, "chat: verse removed before reply arrived; reply dropped");
        return Ok(TurnOutcome { user_message, reply: None, error: result.err().as_ref().map(Into::into) });
    }

    let (reply_text, error) = match result {
        Ok(text) => (text, None),
        Err(e) => {
            warn!(%canvas_id, %verse_id, error = %e, "chat: gateway call failed");
            (format!("{ERROR_ENTRY_PREFIX} {e}"), Some(GatewayErrorBody::from(&e)))
        }
    };
    let reply = canvas
        .document
        .verses
        .append_message(verse_id, Role::Assistant, reply_text)
        .map_err(CanvasError::from)?;
    canvas.touch();

    info!(%canvas_id, %verse_id, failed = error.is_some(), reply_len = reply.content.len(), "chat: turn complete");
    Ok(TurnOutcome { user_message, reply: Some(reply), error })
}

async fn release_pending(state: &AppState, canvas_id: Uuid, verse_id: VerseId) {
    if let Some(canvas) = state.canvases.write().await.get_mut(&canvas_id) {
        canvas.pending.remove(&verse_id);
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
