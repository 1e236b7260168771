//! Background refresh loop
//!
//! Refreshes the loan snapshot once at startup and then every poll
//! interval. A failed cycle is logged and the previous snapshot stays
//! published; the next tick tries again.

use std::time::Duration;

use lendscope_api::AppState;
use lendscope_core::ProtocolError;
use tokio::time::MissedTickBehavior;

/// Run one refresh and log the outcome
pub async fn tick(state: &AppState) {
    match state.refresh().await {
        Ok(snapshot) => {
            tracing::info!(
                block_height = snapshot.block_height,
                "{}",
                snapshot.summary.message()
            );
        }
        Err(ProtocolError::AlreadyInFlight { .. }) => {
            tracing::debug!("Refresh already running, skipping tick");
        }
        Err(e) => {
            tracing::warn!(code = e.error_code(), "Refresh failed: {}", e);
        }
    }
}

/// Refresh forever at `interval_secs` (at least one second)
pub async fn run(state: AppState, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // the first tick completes immediately
        ticker.tick().await;
        tick(&state).await;
    }
}
