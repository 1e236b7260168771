//! Data Transfer Objects for API requests and responses

use axum::http::StatusCode;
use axum::Json;
use lendscope_core::{BlockHeight, ProtocolError};
use loan_auction::{Listing, LoanRecord, LoanSnapshot, Offer, Position, RefreshSummary};
use serde::{Deserialize, Serialize};
use stacks_node_client::capabilities::NodeStatus;

use crate::state::Session;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Node status response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatusResponse {
    pub connected: bool,
    pub url: String,
    pub network: String,
    pub burn_block_height: u64,
    pub stacks_tip_height: u64,
    pub server_version: Option<String>,
    pub latency_ms: Option<u64>,
    /// `Healthy`, `Slow` or `Offline`
    pub health: String,
}

impl NodeStatusResponse {
    pub fn from_status(url: String, network: String, status: &NodeStatus) -> Self {
        Self {
            connected: status.is_online,
            url,
            network,
            burn_block_height: status.burn_block_height,
            stacks_tip_height: status.stacks_tip_height,
            server_version: status.server_version.clone(),
            latency_ms: status.latency_ms,
            health: status.health.as_str().to_string(),
        }
    }
}

/// Node configuration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfigRequest {
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    pub timeout_secs: Option<u64>,
}

/// Sorted/filtered loan list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoansResponse {
    pub loans: Vec<LoanRecord>,
    /// Loans in the snapshot before filtering
    pub total: usize,
    pub block_height: BlockHeight,
    pub fetched_at: u64,
}

/// Counts and status line of the published snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: RefreshSummary,
    pub message: String,
    pub block_height: BlockHeight,
    pub fetched_at: u64,
    /// Set when the latest refresh failed and an older snapshot is shown
    pub last_error: Option<String>,
    /// A newer snapshot is being fetched
    pub refreshing: bool,
}

impl SummaryResponse {
    pub fn new(snapshot: &LoanSnapshot, last_error: Option<String>, refreshing: bool) -> Self {
        Self {
            summary: snapshot.summary.clone(),
            message: snapshot.summary.message(),
            block_height: snapshot.block_height,
            fetched_at: snapshot.fetched_at,
            last_error,
            refreshing,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingsResponse {
    pub listings: Vec<Listing>,
    pub block_height: BlockHeight,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffersResponse {
    pub address: String,
    pub offers: Vec<Offer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub address: String,
    pub positions: Vec<Position>,
    pub block_height: BlockHeight,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub connected: bool,
    pub address: Option<String>,
    pub connected_at: Option<u64>,
}

impl From<Option<Session>> for SessionResponse {
    fn from(session: Option<Session>) -> Self {
        match session {
            Some(s) => Self {
                connected: true,
                address: Some(s.address),
                connected_at: Some(s.connected_at),
            },
            None => Self {
                connected: false,
                address: None,
                connected_at: None,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectRequest {
    pub address: String,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

impl From<&ProtocolError> for ApiError {
    fn from(e: &ProtocolError) -> Self {
        Self::new(e.error_code(), e.user_message())
    }
}

/// Error half of every handler's result
pub type ApiFailure = (StatusCode, Json<ApiError>);

/// Map a protocol error to its HTTP status and body
pub fn reject(e: ProtocolError) -> ApiFailure {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiError::from(&e)))
}
