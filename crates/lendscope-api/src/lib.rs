//! Lendscope-api: HTTP API layer for Lendscope
//!
//! Serves the published loan snapshot and the views derived from it. Every
//! endpoint is read-only with respect to the chain.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::{AppState, Session};
