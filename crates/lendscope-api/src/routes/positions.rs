//! GET /positions/{address} - Active loans in which an account owns a position

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use loan_auction::positions::parse_account;
use loan_auction::scan_positions;

use crate::dto::{reject, ApiFailure, PositionsResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:address", get(get_positions))
}

async fn get_positions(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<PositionsResponse>, ApiFailure> {
    let config = state.config().await;
    // reject bad input before claiming the scan
    parse_account(&address, config.network).map_err(reject)?;

    let _guard = state.position_scan().acquire().map_err(reject)?;
    let snapshot = state.require_snapshot().await.map_err(reject)?;
    let client = state.require_node_client().await.map_err(reject)?;

    let positions = scan_positions(&client, &config, &snapshot, &address)
        .await
        .map_err(reject)?;

    Ok(Json(PositionsResponse {
        address,
        positions,
        block_height: snapshot.block_height,
    }))
}
