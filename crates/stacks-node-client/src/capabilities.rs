//! Node status probing
//!
//! Checks that the node answers `/v2/info` and reports its heights and
//! round-trip latency.

use serde::{Deserialize, Serialize};

use crate::{NodeClient, NodeInfo};

/// Latency above which the node is reported as slow
const SLOW_NODE_MS: u64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum NodeHealth {
    /// Responding within the latency threshold
    Healthy,
    /// Responding, but slowly
    Slow,
    /// Not responding
    Offline,
}

impl NodeHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Slow => "Slow",
            Self::Offline => "Offline",
        }
    }
}

/// Result of probing a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatus {
    pub is_online: bool,

    /// Bitcoin block height seen by the node (the contract clock)
    pub burn_block_height: u64,

    pub stacks_tip_height: u64,

    pub server_version: Option<String>,

    pub network_id: Option<u32>,

    /// Round-trip time of the status request
    pub latency_ms: Option<u64>,

    pub health: NodeHealth,
}

impl NodeStatus {
    pub fn offline() -> Self {
        Self {
            is_online: false,
            burn_block_height: 0,
            stacks_tip_height: 0,
            server_version: None,
            network_id: None,
            latency_ms: None,
            health: NodeHealth::Offline,
        }
    }

    fn from_info(info: NodeInfo, latency_ms: u64) -> Self {
        let health = if latency_ms <= SLOW_NODE_MS {
            NodeHealth::Healthy
        } else {
            NodeHealth::Slow
        };

        Self {
            is_online: true,
            burn_block_height: info.burn_block_height,
            stacks_tip_height: info.stacks_tip_height,
            server_version: info.server_version,
            network_id: info.network_id,
            latency_ms: Some(latency_ms),
            health,
        }
    }
}

/// Check the node with a single, un-retried info request
pub async fn detect_status(client: &NodeClient) -> NodeStatus {
    let started = std::time::Instant::now();

    match client.info_once().await {
        Ok(info) => {
            let latency_ms = started.elapsed().as_millis() as u64;
            NodeStatus::from_info(info, latency_ms)
        }
        Err(e) => {
            tracing::debug!(url = %client.config().url, error = %e, "Node status check failed");
            NodeStatus::offline()
        }
    }
}
