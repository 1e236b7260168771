//! Core type definitions for Lendscope

use serde::{Deserialize, Serialize};
use std::fmt;

/// Loan identifier, assigned sequentially by the loan contract starting at 1
pub type LoanId = u64;

/// Block height on the chain the contract clock follows
pub type BlockHeight = u64;

/// Fully qualified contract identifier (`<deployer>.<name>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId {
    pub deployer: String,
    pub name: String,
}

impl ContractId {
    pub fn new(deployer: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            deployer: deployer.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.deployer, self.name)
    }
}

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }

    /// Address version byte for single-signature accounts
    pub fn single_sig_version(&self) -> u8 {
        match self {
            Self::Mainnet => 22,
            Self::Testnet => 26,
        }
    }

    /// Address version byte for multi-signature accounts
    pub fn multi_sig_version(&self) -> u8 {
        match self {
            Self::Mainnet => 20,
            Self::Testnet => 21,
        }
    }

    pub fn accepts_version(&self, version: u8) -> bool {
        version == self.single_sig_version() || version == self.multi_sig_version()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Constants
pub mod constants {
    /// Average number of Bitcoin blocks per day (10 minute blocks)
    pub const BLOCKS_PER_DAY: u64 = 144;

    /// Days per year used for APY annualization
    pub const DAYS_PER_YEAR: f64 = 365.0;

    /// Decimal places of the Bitcoin-like collateral asset (sats)
    pub const BTC_DECIMALS: u32 = 8;

    /// Decimal places of the stable asset (micro units)
    pub const USDT_DECIMALS: u32 = 6;
}
