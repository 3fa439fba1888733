//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! A single Axum router serves the JSON API under `/api` plus an
//! unauthenticated liveness probe. Handlers translate requests into service
//! calls and map service errors onto HTTP statuses; the body is always the
//! structured `{code, message, retryable}` shape from [`crate::error`].

pub mod auth;
pub mod canvases;
pub mod verses;

use axum::Router;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{ErrorBody, ErrorCode};
use crate::llm::models::{self, ModelInfo};
use crate::state::AppState;

/// Error half of every handler's return type.
pub type ApiError = (StatusCode, Json<ErrorBody>);

pub(crate) fn api_error(status: StatusCode, err: &impl ErrorCode) -> ApiError {
    (status, Json(ErrorBody::from_error(err)))
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/models", get(list_models))
        .route("/api/canvases", get(canvases::list_canvases).post(canvases::create_canvas))
        .route(
            "/api/canvases/{id}",
            get(canvases::get_canvas)
                .put(canvases::replace_canvas)
                .delete(canvases::delete_canvas),
        )
        .route("/api/canvases/{id}/save", post(canvases::save_canvas))
        .route("/api/canvases/{id}/active", put(canvases::set_active_verse))
        .route("/api/canvases/{id}/view", put(canvases::set_view))
        .route("/api/canvases/{id}/verses", post(verses::create_root_verse))
        .route(
            "/api/canvases/{id}/verses/{verse_id}",
            axum::routing::patch(verses::apply_op).delete(verses::remove_verse),
        )
        .route("/api/canvases/{id}/verses/{verse_id}/branches", post(verses::create_branch))
        .route("/api/canvases/{id}/verses/{verse_id}/context", get(verses::verse_context))
        .route("/api/canvases/{id}/verses/{verse_id}/messages", post(verses::send_message))
        .route("/api/canvases/{id}/verses/{verse_id}/insights", post(verses::regenerate_insights))
        .route("/api/canvases/{id}/verses/{verse_id}/system-map", post(verses::regenerate_system_map))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub models: &'static [ModelInfo],
    pub default_model_id: String,
    /// False when no provider key is configured; chat turns will fail.
    pub inference_enabled: bool,
}

/// `GET /api/models` — selectable models and the server default.
async fn list_models(
    axum::extract::State(state): axum::extract::State<AppState>,
    _auth: auth::SharedSecret,
) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: models::MODELS,
        default_model_id: state.config.default_model_id.clone(),
        inference_enabled: state.llm.is_some(),
    })
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
