//! Configuration types for Lendscope

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::constants::{BLOCKS_PER_DAY, BTC_DECIMALS, USDT_DECIMALS};
use crate::{ContractId, Error, Network};

/// Environment variable holding the path of the JSON config file
pub const CONFIG_PATH_ENV: &str = "LENDSCOPE_CONFIG";

/// Environment variable overriding `node.url`
pub const NODE_URL_ENV: &str = "LENDSCOPE_NODE_URL";

/// Node connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node URL (e.g., "https://api.testnet.hiro.so")
    pub url: String,

    /// API key sent as `x-api-key` (optional)
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: "https://api.testnet.hiro.so".to_string(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Deployed contract names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Deployer address shared by all protocol contracts
    pub deployer: String,

    /// Loan auction contract name
    pub loan_protocol: String,

    /// Position marketplace contract name
    pub marketplace: String,

    /// Sender used for read-only calls (defaults to the deployer)
    #[serde(default)]
    pub sender: Option<String>,
}

impl ContractsConfig {
    pub fn loan_contract(&self) -> ContractId {
        ContractId::new(&self.deployer, &self.loan_protocol)
    }

    pub fn marketplace_contract(&self) -> ContractId {
        ContractId::new(&self.deployer, &self.marketplace)
    }

    pub fn sender(&self) -> &str {
        self.sender.as_deref().unwrap_or(&self.deployer)
    }
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            deployer: "ST2BKV3K4DQQS6GMFJYT1MY4TQS228190RCSHAGN3".to_string(),
            loan_protocol: "loan-protocol-v35".to_string(),
            marketplace: "marketplace-contract-v1".to_string(),
            sender: None,
        }
    }
}

/// Batching, retry, and polling knobs for the fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Number of loans fetched concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Maximum attempts per node call (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay after a rate-limit response, doubled each attempt
    #[serde(default = "default_rate_limit_base_delay_ms")]
    pub rate_limit_base_delay_ms: u64,

    /// Delay step after a transport failure, multiplied by the attempt number
    #[serde(default = "default_transient_delay_ms")]
    pub transient_delay_ms: u64,

    /// Background refresh interval
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Pause between loans during a position ownership scan
    #[serde(default = "default_position_check_delay_ms")]
    pub position_check_delay_ms: u64,

    /// Upper bound on offer ids read per loan, whatever the offer nonce says
    #[serde(default = "default_max_offers_per_loan")]
    pub max_offers_per_loan: u64,
}

fn default_batch_size() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_rate_limit_base_delay_ms() -> u64 {
    2_000
}

fn default_transient_delay_ms() -> u64 {
    1_000
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_position_check_delay_ms() -> u64 {
    200
}

fn default_max_offers_per_loan() -> u64 {
    100
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            rate_limit_base_delay_ms: default_rate_limit_base_delay_ms(),
            transient_delay_ms: default_transient_delay_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            position_check_delay_ms: default_position_check_delay_ms(),
            max_offers_per_loan: default_max_offers_per_loan(),
        }
    }
}

/// Asset scaling and chain clock assumptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Decimal places per asset symbol
    #[serde(default = "default_decimals_table")]
    pub decimals: BTreeMap<String, u32>,

    /// Decimal places used for symbols missing from `decimals`
    #[serde(default = "default_unknown_decimals")]
    pub default_decimals: u32,

    /// Collateral asset assumed for loans that carry no asset field
    #[serde(default = "default_collateral_asset")]
    pub default_collateral_asset: String,

    /// Borrow asset assumed for loans that carry no asset field
    #[serde(default = "default_borrow_asset")]
    pub default_borrow_asset: String,

    /// Blocks per day used for duration and APY
    #[serde(default = "default_blocks_per_day")]
    pub blocks_per_day: u64,
}

fn default_decimals_table() -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("BTC".to_string(), BTC_DECIMALS),
        ("SBTC".to_string(), BTC_DECIMALS),
        ("USDT".to_string(), USDT_DECIMALS),
        ("USDA".to_string(), USDT_DECIMALS),
    ])
}

fn default_unknown_decimals() -> u32 {
    USDT_DECIMALS
}

fn default_collateral_asset() -> String {
    "BTC".to_string()
}

fn default_borrow_asset() -> String {
    "USDT".to_string()
}

fn default_blocks_per_day() -> u64 {
    BLOCKS_PER_DAY
}

impl AssetConfig {
    /// Decimal places for an asset symbol, falling back to `default_decimals`
    pub fn decimals_for(&self, symbol: &str) -> u32 {
        match self.decimals.get(&symbol.to_ascii_uppercase()) {
            Some(d) => *d,
            None => {
                tracing::debug!(symbol, "Unknown asset symbol, using default decimals");
                self.default_decimals
            }
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals_table(),
            default_decimals: default_unknown_decimals(),
            default_collateral_asset: default_collateral_asset(),
            default_borrow_asset: default_borrow_asset(),
            blocks_per_day: default_blocks_per_day(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Node connection settings
    pub node: NodeConfig,

    /// Network (mainnet or testnet)
    pub network: Network,

    /// Contract names
    #[serde(default)]
    pub contracts: ContractsConfig,

    /// Fetcher tuning
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Asset scaling
    #[serde(default)]
    pub assets: AssetConfig,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_api_port() -> u16 {
    19080
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            network: Network::Testnet,
            contracts: ContractsConfig::default(),
            fetch: FetchConfig::default(),
            assets: AssetConfig::default(),
            api_port: default_api_port(),
        }
    }
}

impl AppConfig {
    /// Parse a config from JSON text
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Config file named by `LENDSCOPE_CONFIG`, if set and non-empty
    pub fn path_from_env() -> Option<PathBuf> {
        std::env::var_os(CONFIG_PATH_ENV)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Load a config file, or defaults when no path is given, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_json(&text)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(NODE_URL_ENV) {
            if !url.is_empty() {
                config.node.url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.fetch.batch_size == 0 {
            return Err(Error::Config("fetch.batch_size must be at least 1".into()));
        }
        if self.fetch.max_attempts == 0 {
            return Err(Error::Config("fetch.max_attempts must be at least 1".into()));
        }
        if self.assets.blocks_per_day == 0 {
            return Err(Error::Config("assets.blocks_per_day must be at least 1".into()));
        }
        Ok(())
    }
}
