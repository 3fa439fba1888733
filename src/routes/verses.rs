//! Verse routes: creation, branching, mutation, chat, and extraction.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::SharedSecret;
use super::canvases::{canvas_error, canvas_status};
use super::{ApiError, api_error};
use crate::llm::GatewayError;
use crate::services::chat::{self, ChatError, TurnOutcome};
use crate::services::extraction::{self, ExtractionError};
use crate::services::verses;
use crate::state::AppState;
use crate::verse::{BoardCards, ContextTurn, MessageId, Point, SystemMapData, Verse, VerseId, VerseOp};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRootBody {
    pub name: Option<String>,
    pub model_id: Option<String>,
    pub position: Option<Point>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateBranchBody {
    pub model_id: Option<String>,
    pub source_message_id: Option<MessageId>,
}

#[derive(Deserialize)]
pub struct SendMessageBody {
    pub content: String,
}

#[derive(Serialize)]
pub struct RemovedResponse {
    pub removed: Vec<VerseId>,
}

/// `POST /api/canvases/:id/verses` — new root verse.
pub async fn create_root_verse(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path(canvas_id): Path<Uuid>,
    Json(body): Json<CreateRootBody>,
) -> Result<(StatusCode, Json<Verse>), ApiError> {
    let verse = verses::create_root_verse(
        &state,
        canvas_id,
        body.name.as_deref(),
        body.model_id.as_deref(),
        body.position.unwrap_or_default(),
    )
    .await
    .map_err(canvas_error)?;
    Ok((StatusCode::CREATED, Json(verse)))
}

/// `POST /api/canvases/:id/verses/:verse_id/branches`
pub async fn create_branch(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path((canvas_id, parent_id)): Path<(Uuid, VerseId)>,
    Json(body): Json<CreateBranchBody>,
) -> Result<(StatusCode, Json<Verse>), ApiError> {
    let verse = verses::create_branch(&state, canvas_id, parent_id, body.model_id.as_deref(), body.source_message_id)
        .await
        .map_err(canvas_error)?;
    Ok((StatusCode::CREATED, Json(verse)))
}

/// `PATCH /api/canvases/:id/verses/:verse_id` — apply one `VerseOp`.
pub async fn apply_op(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path((canvas_id, verse_id)): Path<(Uuid, VerseId)>,
    Json(op): Json<VerseOp>,
) -> Result<Json<Verse>, ApiError> {
    let verse = verses::apply_op(&state, canvas_id, verse_id, op)
        .await
        .map_err(canvas_error)?;
    Ok(Json(verse))
}

/// `DELETE /api/canvases/:id/verses/:verse_id` — removes the whole subtree.
pub async fn remove_verse(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path((canvas_id, verse_id)): Path<(Uuid, VerseId)>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = verses::remove_verse(&state, canvas_id, verse_id)
        .await
        .map_err(canvas_error)?;
    Ok(Json(RemovedResponse { removed }))
}

/// `GET /api/canvases/:id/verses/:verse_id/context`
pub async fn verse_context(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path((canvas_id, verse_id)): Path<(Uuid, VerseId)>,
) -> Result<Json<Vec<ContextTurn>>, ApiError> {
    let context = verses::verse_context(&state, canvas_id, verse_id)
        .await
        .map_err(canvas_error)?;
    Ok(Json(context))
}

/// `POST /api/canvases/:id/verses/:verse_id/messages` — one chat turn.
///
/// A gateway failure still answers 200: the turn produced an error entry in
/// the transcript, reported in `error`.
pub async fn send_message(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path((canvas_id, verse_id)): Path<(Uuid, VerseId)>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let outcome = chat::send_turn(&state, canvas_id, verse_id, &body.content)
        .await
        .map_err(chat_error)?;
    Ok(Json(outcome))
}

/// `POST /api/canvases/:id/verses/:verse_id/insights`
pub async fn regenerate_insights(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path((canvas_id, verse_id)): Path<(Uuid, VerseId)>,
) -> Result<Json<BoardCards>, ApiError> {
    let board = extraction::regenerate_insights(&state, canvas_id, verse_id)
        .await
        .map_err(extraction_error)?;
    Ok(Json(board))
}

/// `POST /api/canvases/:id/verses/:verse_id/system-map`
pub async fn regenerate_system_map(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path((canvas_id, verse_id)): Path<(Uuid, VerseId)>,
) -> Result<Json<SystemMapData>, ApiError> {
    let map = extraction::regenerate_system_map(&state, canvas_id, verse_id)
        .await
        .map_err(extraction_error)?;
    Ok(Json(map))
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

pub(crate) fn gateway_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Unauthorized(_) | GatewayError::Invalid(_) => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn chat_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
        ChatError::TurnInFlight(_) => StatusCode::CONFLICT,
        ChatError::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ChatError::Canvas(e) => canvas_status(e),
    }
}

pub(crate) fn extraction_status(err: &ExtractionError) -> StatusCode {
    match err {
        ExtractionError::EmptyTranscript(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ExtractionError::Gateway(e) => gateway_status(e),
        ExtractionError::Parse(_) => StatusCode::BAD_GATEWAY,
        ExtractionError::Canvas(e) => canvas_status(e),
    }
}

fn chat_error(err: ChatError) -> ApiError {
    api_error(chat_status(&err), &err)
}

fn extraction_error(err: ExtractionError) -> ApiError {
    api_error(extraction_status(&err), &err)
}

#[cfg(test)]
#[path = "verses_test.rs"]
mod tests;
