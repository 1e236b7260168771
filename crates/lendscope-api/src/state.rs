//! Application state shared across API handlers

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use lendscope_core::{AppConfig, Network, NodeConfig, ProtocolError};
use loan_auction::constants::{
    RESOURCE_LOAN_REFRESH, RESOURCE_MARKETPLACE_SCAN, RESOURCE_POSITION_SCAN,
};
use loan_auction::{refresh_loans, LoanSnapshot, SingleFlight};
use serde::Serialize;
use stacks_node_client::{NodeClient, RetryPolicy};
use tokio::sync::RwLock;

/// The account the user has connected.
///
/// Held by [`AppState`] and replaced on connect/disconnect. Only the address
/// is kept; signing happens elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    pub address: String,
    /// Unix seconds
    pub connected_at: u64,
}

impl Session {
    pub fn new(address: String) -> Self {
        Self {
            address,
            connected_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RwLock<AppConfig>,
    node_client: RwLock<Option<NodeClient>>,
    snapshot: RwLock<Option<Arc<LoanSnapshot>>>,
    /// Message from the most recent failed refresh, cleared on success
    last_error: RwLock<Option<String>>,
    session: RwLock<Option<Session>>,
    loan_refresh: SingleFlight,
    position_scan: SingleFlight,
    marketplace_scan: SingleFlight,
}

impl AppState {
    /// Create a new application state with default config
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create with a specific config
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config: RwLock::new(config),
                node_client: RwLock::new(None),
                snapshot: RwLock::new(None),
                last_error: RwLock::new(None),
                session: RwLock::new(None),
                loan_refresh: SingleFlight::new(RESOURCE_LOAN_REFRESH),
                position_scan: SingleFlight::new(RESOURCE_POSITION_SCAN),
                marketplace_scan: SingleFlight::new(RESOURCE_MARKETPLACE_SCAN),
            }),
        }
    }

    /// Get current config
    pub async fn config(&self) -> AppConfig {
        self.inner.config.read().await.clone()
    }

    /// Update node configuration and drop the cached client
    pub async fn set_node_config(&self, node_config: NodeConfig) {
        let mut config = self.inner.config.write().await;
        config.node = node_config;

        let mut client = self.inner.node_client.write().await;
        *client = None;
    }

    /// Get or create node client
    pub async fn node_client(&self) -> Option<NodeClient> {
        {
            let client = self.inner.node_client.read().await;
            if client.is_some() {
                return client.clone();
            }
        }

        let config = self.inner.config.read().await;
        tracing::info!(url = %config.node.url, "Creating node client");
        match NodeClient::new(config.node.clone(), RetryPolicy::from(&config.fetch)) {
            Ok(client) => {
                let mut cached = self.inner.node_client.write().await;
                *cached = Some(client.clone());
                Some(client)
            }
            Err(e) => {
                tracing::warn!(url = %config.node.url, error = %e, "Failed to create node client");
                None
            }
        }
    }

    /// Like [`node_client`](Self::node_client), but a missing client is an error
    pub async fn require_node_client(&self) -> Result<NodeClient, ProtocolError> {
        self.node_client()
            .await
            .ok_or_else(|| ProtocolError::StateUnavailable {
                reason: "node client could not be created".to_string(),
            })
    }

    pub async fn network(&self) -> Network {
        self.inner.config.read().await.network
    }

    /// Last published snapshot, if any refresh has succeeded
    pub async fn snapshot(&self) -> Option<Arc<LoanSnapshot>> {
        self.inner.snapshot.read().await.clone()
    }

    /// Published snapshot, or the reason there is none
    pub async fn require_snapshot(&self) -> Result<Arc<LoanSnapshot>, ProtocolError> {
        if let Some(snapshot) = self.snapshot().await {
            return Ok(snapshot);
        }
        let reason = self
            .last_error()
            .await
            .unwrap_or_else(|| "loans have not been loaded yet".to_string());
        Err(ProtocolError::StateUnavailable { reason })
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.last_error.read().await.clone()
    }

    /// Run one refresh cycle and publish its snapshot.
    ///
    /// On failure the previous snapshot stays published and the error is
    /// recorded. A refresh already in progress makes this return
    /// `AlreadyInFlight` without touching the node.
    pub async fn refresh(&self) -> Result<Arc<LoanSnapshot>, ProtocolError> {
        let _guard = self.inner.loan_refresh.acquire()?;
        let client = self.require_node_client().await?;
        let config = self.config().await;

        match refresh_loans(&client, &config).await {
            Ok(snapshot) => Ok(self.publish(snapshot).await),
            Err(e) => {
                tracing::warn!(error = %e, "Refresh failed, keeping previous snapshot");
                *self.inner.last_error.write().await = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Replace the published snapshot wholesale
    pub async fn publish(&self, snapshot: LoanSnapshot) -> Arc<LoanSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.inner.snapshot.write().await = Some(snapshot.clone());
        *self.inner.last_error.write().await = None;
        snapshot
    }

    /// Whether a refresh cycle is running right now
    pub fn is_refreshing(&self) -> bool {
        self.inner.loan_refresh.is_in_flight()
    }

    pub fn position_scan(&self) -> &SingleFlight {
        &self.inner.position_scan
    }

    pub fn marketplace_scan(&self) -> &SingleFlight {
        &self.inner.marketplace_scan
    }

    pub async fn session(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    /// Connect an account after checking it is a valid address for the
    /// configured network.
    pub async fn connect(&self, address: String) -> Result<Session, ProtocolError> {
        loan_auction::positions::parse_account(&address, self.network().await)?;
        let session = Session::new(address);
        tracing::info!(address = %session.address, "Account connected");
        *self.inner.session.write().await = Some(session.clone());
        Ok(session)
    }

    pub async fn disconnect(&self) {
        let mut session = self.inner.session.write().await;
        if let Some(old) = session.take() {
            tracing::info!(address = %old.address, "Account disconnected");
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TESTNET_ACCOUNT: &str = "ST2BKV3K4DQQS6GMFJYT1MY4TQS228190RCSHAGN3";

    fn testnet_state() -> AppState {
        let mut config = AppConfig::default();
        config.network = Network::Testnet;
        AppState::with_config(config)
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let state = testnet_state();
        assert!(state.session().await.is_none());

        let session = state.connect(TESTNET_ACCOUNT.to_string()).await.unwrap();
        assert_eq!(session.address, TESTNET_ACCOUNT);
        assert_eq!(state.session().await, Some(session));

        state.disconnect().await;
        assert!(state.session().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_other_network() {
        let mut config = AppConfig::default();
        config.network = Network::Mainnet;
        let state = AppState::with_config(config);

        let err = state.connect(TESTNET_ACCOUNT.to_string()).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(state.session().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_unavailable() {
        let state = testnet_state();
        let err = state.require_snapshot().await.unwrap_err();
        assert_eq!(err.error_code(), "state_unavailable");
    }

    #[tokio::test]
    async fn test_refresh_is_single_flight() {
        let state = testnet_state();
        let held = state.inner.loan_refresh.acquire().unwrap();
        assert!(state.is_refreshing());

        let err = state.refresh().await.unwrap_err();
        assert!(matches!(err, ProtocolError::AlreadyInFlight { .. }));

        drop(held);
        assert!(!state.is_refreshing());
    }

    #[tokio::test]
    async fn test_set_node_config_resets_client() {
        let state = testnet_state();
        assert!(state.node_client().await.is_some());

        state
            .set_node_config(NodeConfig {
                url: "http://127.0.0.1:1".to_string(),
                ..NodeConfig::default()
            })
            .await;
        let client = state.node_client().await.unwrap();
        assert_eq!(client.config().url, "http://127.0.0.1:1");
    }
}
