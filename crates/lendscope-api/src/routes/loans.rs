//! Loan snapshot endpoints
//!
//! - GET /loans - Sorted and filtered view of the published snapshot
//! - GET /loans/summary - Counts and status line
//! - GET /loans/{id} - Single loan
//! - POST /loans/refresh - Run a refresh cycle now

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use lendscope_core::LoanId;
use loan_auction::{LoanQuery, LoanRecord};

use crate::dto::{reject, ApiError, ApiFailure, LoansResponse, SummaryResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_loans))
        .route("/summary", get(get_summary))
        .route("/refresh", post(refresh))
        .route("/:id", get(get_loan))
}

async fn list_loans(
    State(state): State<AppState>,
    Query(query): Query<LoanQuery>,
) -> Result<Json<LoansResponse>, ApiFailure> {
    let snapshot = state.require_snapshot().await.map_err(reject)?;
    let loans = query.apply(&snapshot);

    Ok(Json(LoansResponse {
        loans,
        total: snapshot.records.len(),
        block_height: snapshot.block_height,
        fetched_at: snapshot.fetched_at,
    }))
}

async fn get_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiFailure> {
    let snapshot = state.require_snapshot().await.map_err(reject)?;
    Ok(Json(SummaryResponse::new(
        &snapshot,
        state.last_error().await,
        state.is_refreshing(),
    )))
}

async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<LoanId>,
) -> Result<Json<LoanRecord>, ApiFailure> {
    let snapshot = state.require_snapshot().await.map_err(reject)?;
    snapshot.get(id).cloned().map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("Loan {} not found", id))),
        )
    })
}

async fn refresh(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiFailure> {
    let snapshot = state.refresh().await.map_err(reject)?;
    Ok(Json(SummaryResponse::new(&snapshot, None, false)))
}
