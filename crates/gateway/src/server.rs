//! Router, shared state and the listener loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use csv_agent_controller::QueryConfig;
use csv_agent_core::LlmClient;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{health_check, query, upload};

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Query loop settings (attempts per query).
    pub query: QueryConfig,
    /// Data rows included in the model's dataset context.
    pub preview_rows: usize,
    /// Longest raw-reply excerpt returned in error bodies.
    pub excerpt_len: usize,
    /// Request body limit, which bounds the CSV upload size.
    pub max_upload_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            preview_rows: 20,
            excerpt_len: 200,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// State shared by all requests.
pub struct AppState {
    /// Chat model behind every dataframe agent.
    pub llm: Arc<dyn LlmClient>,
    pub config: GatewayConfig,
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmClient>, config: GatewayConfig) -> Self {
        Self { llm, config }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/query", post(query))
        .route("/v1/query/upload", post(upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("CSV agent gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("gateway server failed: {}", e))?;

    Ok(())
}
