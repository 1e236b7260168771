//! Node status and configuration endpoints

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use lendscope_core::NodeConfig;
use serde::Deserialize;
use stacks_node_client::NodeStatus;

use crate::dto::{ApiError, ApiFailure, NodeConfigRequest, NodeStatusResponse};
use crate::AppState;

/// Create node routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/configure", post(configure))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Answer from the last check instead of contacting the node
    #[serde(default)]
    pub cached: bool,
}

/// GET /node/status - Check the configured node.
///
/// With `?cached=true` the last result is returned when there is one.
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Json<NodeStatusResponse> {
    let config = state.config().await;

    let status = match state.node_client().await {
        Some(client) => match client.status().await {
            Some(last) if query.cached => last,
            _ => client.refresh_status().await,
        },
        None => NodeStatus::offline(),
    };

    Json(NodeStatusResponse::from_status(
        config.node.url,
        config.network.as_str().to_string(),
        &status,
    ))
}

/// POST /node/configure - Point at a different node, then report its status
pub async fn configure(
    State(state): State<AppState>,
    Json(request): Json<NodeConfigRequest>,
) -> Result<Json<NodeStatusResponse>, ApiFailure> {
    let url = request.url.trim().trim_end_matches('/').to_string();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err((
            axum::http::StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request("Node URL must start with http:// or https://")),
        ));
    }

    let current = state.config().await.node;
    let node_config = NodeConfig {
        url,
        api_key: request.api_key,
        timeout_secs: request.timeout_secs.unwrap_or(current.timeout_secs),
    };
    tracing::info!(url = %node_config.url, "Node reconfigured");
    state.set_node_config(node_config).await;

    Ok(get_status(State(state), Query(StatusQuery::default())).await)
}
