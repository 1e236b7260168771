//! stacks-node-client: read-only access to a Stacks node
//!
//! Wraps the node's chain-info and read-only contract call endpoints. Every
//! call is retried according to a [`RetryPolicy`]: rate limits back off
//! exponentially, transport failures linearly, anything else fails at once.

pub mod capabilities;
pub mod queries;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use lendscope_core::{BlockHeight, ContractId, NodeConfig, NodeError};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub use capabilities::{NodeHealth, NodeStatus};
pub use retry::{with_retry, Backoff, RetryPolicy};

/// Result sentinels the node uses for an absent optional
const NONE_SENTINELS: [&str; 2] = ["(none)", "0x09"];

/// Result type for node client operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Subset of `GET /v2/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub burn_block_height: u64,
    #[serde(default)]
    pub stacks_tip_height: u64,
    #[serde(default)]
    pub server_version: Option<String>,
    #[serde(default)]
    pub network_id: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CallReadRequest<'a> {
    sender: &'a str,
    arguments: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CallReadResponse {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

/// Stacks node client
#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    config: NodeConfig,
    policy: RetryPolicy,
    status: Arc<RwLock<Option<NodeStatus>>>,
}

impl NodeClient {
    /// Build a client. No request is made until the first call.
    pub fn new(config: NodeConfig, policy: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let value = HeaderValue::from_str(&config.api_key).map_err(|e| {
                NodeError::ParseError(format!("API key is not a valid header value: {}", e))
            })?;
            headers.insert("x-api-key", value);
        }

        let http = reqwest::Client::builder()
            .user_agent("lendscope")
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| NodeError::RemoteUnavailable {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            config,
            policy,
            status: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Check the node again and cache the result
    pub async fn refresh_status(&self) -> NodeStatus {
        let status = capabilities::detect_status(self).await;
        let mut lock = self.status.write().await;
        *lock = Some(status.clone());
        status
    }

    /// Result of the last check (may be stale)
    pub async fn status(&self) -> Option<NodeStatus> {
        let lock = self.status.read().await;
        lock.clone()
    }

    /// `GET /v2/info` with retry
    pub async fn info(&self) -> Result<NodeInfo> {
        retry::retry_node(&self.policy, "info", |_| self.info_once()).await
    }

    /// Current Bitcoin block height as seen by the node
    pub async fn burn_block_height(&self) -> Result<BlockHeight> {
        Ok(self.info().await?.burn_block_height)
    }

    /// Call a read-only contract function with hex-encoded arguments.
    ///
    /// Returns `None` when the node answers with the absent sentinel,
    /// otherwise the raw hex result.
    pub async fn call_read_only(
        &self,
        contract: &ContractId,
        function: &str,
        sender: &str,
        arguments: &[String],
    ) -> Result<Option<String>> {
        let label = format!("{}::{}", contract.name, function);
        retry::retry_node(&self.policy, &label, |_| {
            self.call_read_only_once(contract, function, sender, arguments)
        })
        .await
    }

    pub(crate) async fn info_once(&self) -> Result<NodeInfo> {
        let url = format!("{}/v2/info", self.base_url());
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = check_status(response, None).await?;
        response
            .json::<NodeInfo>()
            .await
            .map_err(|e| NodeError::ParseError(format!("Invalid /v2/info response: {}", e)))
    }

    async fn call_read_only_once(
        &self,
        contract: &ContractId,
        function: &str,
        sender: &str,
        arguments: &[String],
    ) -> Result<Option<String>> {
        let url = format!(
            "{}/v2/contracts/call-read/{}/{}/{}",
            self.base_url(),
            contract.deployer,
            contract.name,
            function
        );

        let response = self
            .http
            .post(&url)
            .json(&CallReadRequest { sender, arguments })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = check_status(response, Some(contract)).await?;
        let body: CallReadResponse = response
            .json()
            .await
            .map_err(|e| NodeError::ParseError(format!("Invalid call-read response: {}", e)))?;

        if !body.okay {
            let cause = body.cause.unwrap_or_default();
            if is_missing_contract(&cause) {
                return Err(NodeError::ContractNotFound {
                    contract: contract.to_string(),
                });
            }
            return Err(NodeError::CallRejected { cause });
        }

        let result = body
            .result
            .ok_or_else(|| NodeError::ParseError("call-read response missing result".into()))?;

        if NONE_SENTINELS.contains(&result.trim()) {
            return Ok(None);
        }
        Ok(Some(result))
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn transport_error(&self, e: reqwest::Error) -> NodeError {
        NodeError::RemoteUnavailable {
            url: self.config.url.clone(),
            reason: e.to_string(),
        }
    }
}

async fn check_status(
    response: reqwest::Response,
    contract: Option<&ContractId>,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(NodeError::RateLimited { attempts: 1 });
    }

    let body = response.text().await.unwrap_or_default();
    if let Some(contract) = contract {
        if status == StatusCode::NOT_FOUND || is_missing_contract(&body) {
            return Err(NodeError::ContractNotFound {
                contract: contract.to_string(),
            });
        }
    }

    Err(NodeError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}

fn is_missing_contract(text: &str) -> bool {
    text.contains("NoSuchContract") || text.contains("does not exist")
}
