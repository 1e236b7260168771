//! API route handlers

pub mod health;
pub mod loans;
pub mod marketplace;
pub mod node;
pub mod positions;
pub mod session;

use axum::{routing::get, Router};

use crate::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/node", node::router())
        .nest("/loans", loans::router())
        .nest("/marketplace", marketplace::router())
        .nest("/positions", positions::router())
        .nest("/session", session::router())
        .with_state(state)
}
