//! Request handlers.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use csv_agent_controller::{render, QueryController, ViewBlock, ViewSink};
use csv_agent_core::{Error, PromptRequest};
use csv_agent_model_gateway::{DataFrameAgent, Dataset};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::server::AppState;

const DEFAULT_FILE_NAME: &str = "upload.csv";

/// Body of `POST /v1/query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryBody {
    /// CSV content as text.
    pub csv: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub dataset_description: String,
    #[serde(default)]
    pub objectives: String,
    pub query: String,
}

/// Successful reply of `POST /v1/query` and `POST /v1/query/upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReply {
    /// Model calls used, including re-prompts.
    pub attempts: usize,
    pub blocks: Vec<ViewBlock>,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryBody>,
) -> Result<Json<QueryReply>, ApiError> {
    let request = PromptRequest {
        persona: body.persona,
        dataset_description: body.dataset_description,
        objectives: body.objectives,
        query: body.query,
    };
    answer(&state, body.file_name, body.csv.into_bytes(), request)
        .await
        .map(Json)
}

/// Multipart form: a `file` part with the CSV bytes plus text parts
/// `persona`, `dataset_description`, `objectives` and `query`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<QueryReply>, ApiError> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut request = PromptRequest::default();
    let mut has_query = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            file = Some((file_name, bytes.to_vec()));
            continue;
        }

        let slot = match name.as_str() {
            "persona" => &mut request.persona,
            "dataset_description" => &mut request.dataset_description,
            "objectives" => &mut request.objectives,
            "query" => {
                has_query = true;
                &mut request.query
            }
            other => {
                tracing::debug!(field = other, "Ignoring form field");
                continue;
            }
        };
        *slot = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }

    let (file_name, bytes) = file.ok_or_else(|| ApiError::bad_request("missing `file` part"))?;
    if !has_query {
        return Err(ApiError::bad_request("missing `query` part"));
    }

    answer(&state, file_name, bytes, request).await.map(Json)
}

/// Load the dataset, run the query loop and render the result as view blocks.
async fn answer(
    state: &AppState,
    file_name: Option<String>,
    csv: Vec<u8>,
    request: PromptRequest,
) -> Result<QueryReply, ApiError> {
    let excerpt_len = state.config.excerpt_len;
    let to_api = |e: Error| {
        tracing::warn!(error = %e, "Query failed");
        ApiError::from_error(&e, excerpt_len)
    };

    let file_name = file_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    let preview_rows = state.config.preview_rows;
    let dataset =
        tokio::task::spawn_blocking(move || Dataset::from_bytes(file_name, &csv, preview_rows))
            .await
            .map_err(|e| Error::controller(format!("dataset task failed: {e}")))
            .and_then(|loaded| loaded)
            .map_err(to_api)?;

    let agent = DataFrameAgent::new(state.llm.clone(), dataset);
    let controller = QueryController::new(state.config.query.clone()).with_agent(Arc::new(agent));
    let outcome = controller.ask(&request).await.map_err(to_api)?;

    let mut sink = ViewSink::new();
    render(&outcome.response, &mut sink).map_err(to_api)?;

    Ok(QueryReply {
        attempts: outcome.attempts,
        blocks: sink.into_blocks(),
    })
}
