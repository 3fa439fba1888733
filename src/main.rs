use std::sync::Arc;

use versecanvas::config::ServerConfig;
use versecanvas::llm::{InferenceGateway, LlmClient};
use versecanvas::{db, routes, services, state};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env().expect("invalid server configuration");
    tracing::info!(?config, "config loaded");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    // Initialize LLM client (non-fatal: AI features disabled if config missing).
    let llm: Option<Arc<dyn InferenceGateway>> = match LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(providers = ?client.providers(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; AI features disabled");
            None
        }
    };

    let port = config.port;
    let state = state::AppState::new(pool, llm, config);

    // Spawn background persistence task.
    let _persistence = services::persistence::spawn_persistence_task(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "versecanvas listening");
    axum::serve(listener, app).await.expect("server failed");
}
