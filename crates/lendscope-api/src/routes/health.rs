//! Health check endpoint

use axum::Json;

use crate::dto::HealthResponse;

/// GET /health - Liveness only; does not contact the node
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
