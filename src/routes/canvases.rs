//! Canvas document routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::SharedSecret;
use super::{ApiError, api_error};
use crate::services::canvas::{self, CanvasError, CanvasSummary};
use crate::state::{AppState, CanvasDocument, CanvasView};
use crate::verse::{VerseError, VerseId};

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCanvasBody {
    pub title: Option<String>,
    pub owner_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveBody {
    pub verse_id: Option<VerseId>,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub saved: bool,
}

/// `GET /api/canvases?owner=K` — stored canvases, newest first.
pub async fn list_canvases(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<CanvasSummary>>, ApiError> {
    let rows = canvas::list_canvases(&state.pool, &query.owner)
        .await
        .map_err(canvas_error)?;
    Ok(Json(rows))
}

/// `POST /api/canvases` — new canvas with one root verse.
pub async fn create_canvas(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Json(body): Json<CreateCanvasBody>,
) -> (StatusCode, Json<CanvasDocument>) {
    let document = canvas::create_canvas(&state, body.title.as_deref(), &body.owner_key).await;
    (StatusCode::CREATED, Json(document))
}

/// `GET /api/canvases/:id` — load the document, hydrating it if needed.
pub async fn get_canvas(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path(canvas_id): Path<Uuid>,
) -> Result<Json<CanvasDocument>, ApiError> {
    let document = canvas::get_canvas(&state, canvas_id)
        .await
        .map_err(canvas_error)?;
    Ok(Json(document))
}

/// `PUT /api/canvases/:id` — replace the whole document.
pub async fn replace_canvas(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path(canvas_id): Path<Uuid>,
    Json(document): Json<CanvasDocument>,
) -> Json<CanvasDocument> {
    Json(canvas::replace_canvas(&state, canvas_id, document).await)
}

/// `DELETE /api/canvases/:id?owner=K`
pub async fn delete_canvas(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path(canvas_id): Path<Uuid>,
    Query(query): Query<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
    canvas::remove_canvas(&state, canvas_id, &query.owner)
        .await
        .map_err(canvas_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/canvases/:id/save` — flush now instead of waiting for the
/// persistence cycle.
pub async fn save_canvas(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path(canvas_id): Path<Uuid>,
) -> Result<Json<SaveResponse>, ApiError> {
    let saved = canvas::flush_canvas(&state, canvas_id)
        .await
        .map_err(canvas_error)?;
    Ok(Json(SaveResponse { saved }))
}

/// `PUT /api/canvases/:id/active`
pub async fn set_active_verse(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path(canvas_id): Path<Uuid>,
    Json(body): Json<SetActiveBody>,
) -> Result<StatusCode, ApiError> {
    canvas::set_active_verse(&state, canvas_id, body.verse_id)
        .await
        .map_err(canvas_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/canvases/:id/view`
pub async fn set_view(
    State(state): State<AppState>,
    _auth: SharedSecret,
    Path(canvas_id): Path<Uuid>,
    Json(view): Json<CanvasView>,
) -> Result<StatusCode, ApiError> {
    canvas::set_view(&state, canvas_id, view)
        .await
        .map_err(canvas_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn canvas_status(err: &CanvasError) -> StatusCode {
    match err {
        CanvasError::NotFound(_) => StatusCode::NOT_FOUND,
        CanvasError::Database(_) | CanvasError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CanvasError::Verse(e) => verse_status(e),
    }
}

pub(crate) fn verse_status(err: &VerseError) -> StatusCode {
    match err {
        VerseError::VerseNotFound(_)
        | VerseError::ComponentNotFound { .. }
        | VerseError::CardNotFound { .. }
        | VerseError::MapNodeNotFound { .. }
        | VerseError::MapEdgeNotFound { .. } => StatusCode::NOT_FOUND,
        VerseError::InvalidReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        VerseError::DuplicateVerse(_) => StatusCode::CONFLICT,
    }
}

pub(crate) fn canvas_error(err: CanvasError) -> ApiError {
    api_error(canvas_status(&err), &err)
}

#[cfg(test)]
#[path = "canvases_test.rs"]
mod tests;
