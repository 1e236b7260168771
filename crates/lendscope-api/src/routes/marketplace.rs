//! Position marketplace endpoints
//!
//! - GET /marketplace/listings - Listed positions with loan terms
//! - GET /marketplace/offers/{address} - Offers placed by an account

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use loan_auction::{fetch_listings, fetch_offers_by};

use crate::dto::{reject, ApiFailure, ListingsResponse, OffersResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/listings", get(get_listings))
        .route("/offers/:address", get(get_offers))
}

async fn get_listings(State(state): State<AppState>) -> Result<Json<ListingsResponse>, ApiFailure> {
    let _guard = state.marketplace_scan().acquire().map_err(reject)?;
    let snapshot = state.require_snapshot().await.map_err(reject)?;
    let client = state.require_node_client().await.map_err(reject)?;
    let config = state.config().await;

    let listings = fetch_listings(&client, &config, &snapshot)
        .await
        .map_err(reject)?;

    Ok(Json(ListingsResponse {
        listings,
        block_height: snapshot.block_height,
    }))
}

async fn get_offers(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<OffersResponse>, ApiFailure> {
    let _guard = state.marketplace_scan().acquire().map_err(reject)?;
    let snapshot = state.require_snapshot().await.map_err(reject)?;
    let client = state.require_node_client().await.map_err(reject)?;
    let config = state.config().await;

    let offers = fetch_offers_by(&client, &config, &snapshot, &address)
        .await
        .map_err(reject)?;

    Ok(Json(OffersResponse { address, offers }))
}
