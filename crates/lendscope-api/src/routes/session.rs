//! Connected-account session endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::dto::{reject, ApiFailure, ConnectRequest, SessionResponse};
use crate::{AppState, Session};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_session))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
}

async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(state.session().await.into())
}

async fn connect(
    State(state): State<AppState>,
    Json(request): Json<ConnectRequest>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    let session = state
        .connect(request.address.trim().to_string())
        .await
        .map_err(reject)?;
    Ok(Json(Some(session).into()))
}

async fn disconnect(State(state): State<AppState>) -> Json<SessionResponse> {
    state.disconnect().await;
    Json(SessionResponse::from(None::<Session>))
}
