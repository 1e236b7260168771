//! Error types for Lendscope

use thiserror::Error;

use crate::LoanId;

/// Core errors that can occur in Lendscope
#[derive(Debug, Error)]
pub enum Error {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// How a failed node call should be treated by the retry wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// The node asked us to slow down (HTTP 429)
    RateLimited,
    /// Transport-level failure that may succeed on a later attempt
    Transient,
    /// Retrying will not help
    Fatal,
}

/// Node connection and read-only call errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Node unreachable at {url}: {reason}")]
    RemoteUnavailable { url: String, reason: String },

    #[error("Node rate limit still active after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Node returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Contract not found: {contract}")]
    ContractNotFound { contract: String },

    #[error("Read-only call rejected: {cause}")]
    CallRejected { cause: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl NodeError {
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. } => RetryClass::RateLimited,
            Self::RemoteUnavailable { .. } => RetryClass::Transient,
            Self::HttpStatus { status, .. } if *status >= 502 && *status <= 504 => {
                RetryClass::Transient
            }
            _ => RetryClass::Fatal,
        }
    }
}

/// Protocol-specific errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Contract {contract} is not initialized")]
    NotInitialized { contract: String },

    #[error("Failed to fetch loan {id}: {reason}")]
    RecordFetchFailed { id: LoanId, reason: String },

    #[error("Unexpected value in {context}: {reason}")]
    DecodeAnomaly { context: String, reason: String },

    #[error("No loans could be loaded ({failed} of {attempted} failed)")]
    NoRecordsLoaded { attempted: u64, failed: u64 },

    #[error("Protocol state unavailable: {reason}")]
    StateUnavailable { reason: String },

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("A {resource} scan is already in progress")]
    AlreadyInFlight { resource: &'static str },

    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Result type alias for Lendscope operations
pub type Result<T> = std::result::Result<T, Error>;

impl ProtocolError {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotInitialized { .. } => "contract_not_initialized",
            Self::RecordFetchFailed { .. } => "record_fetch_failed",
            Self::DecodeAnomaly { .. } => "decode_anomaly",
            Self::NoRecordsLoaded { .. } => "no_records_loaded",
            Self::StateUnavailable { .. } => "state_unavailable",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::AlreadyInFlight { .. } => "already_in_flight",
            Self::Node(NodeError::ContractNotFound { .. }) => "contract_not_found",
            Self::Node(NodeError::RateLimited { .. }) => "rate_limited",
            Self::Node(_) => "remote_unavailable",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAddress { .. } => 400,
            Self::NotInitialized { .. } | Self::Node(NodeError::ContractNotFound { .. }) => 424,
            Self::AlreadyInFlight { .. } => 409,
            Self::Node(NodeError::RateLimited { .. }) => 429,
            Self::RecordFetchFailed { .. }
            | Self::DecodeAnomaly { .. }
            | Self::NoRecordsLoaded { .. }
            | Self::StateUnavailable { .. }
            | Self::Node(_) => 503,
        }
    }

    /// Short message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Node(NodeError::ContractNotFound { contract }) => {
                format!("Contract not found: check the configured contract names ({})", contract)
            }
            Self::NotInitialized { .. } => {
                "Contract not initialized: it must be initialized before loans can be read"
                    .to_string()
            }
            Self::NoRecordsLoaded { .. } => "Failed to load any loans. Please try again.".to_string(),
            Self::InvalidAddress { address, .. } => format!("Invalid address: {}", address),
            Self::AlreadyInFlight { resource } => format!("A {} scan is already running", resource),
            _ => "Temporary error reading the contract. Please try again.".to_string(),
        }
    }
}
