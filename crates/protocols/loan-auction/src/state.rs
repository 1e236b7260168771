//! Loan auction protocol state types

use std::fmt;

use lendscope_core::{BlockHeight, LoanId};
use serde::{Deserialize, Serialize, Serializer};

/// Loan lifecycle status as reported by the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Auction,
    Active,
    Repaid,
    Defaulted,
    Failed,
    Unknown,
}

impl LoanStatus {
    /// Map the contract's status string. Anything unrecognized is `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "auction" => Self::Auction,
            "active" => Self::Active,
            "repaid" => Self::Repaid,
            "defaulted" => Self::Defaulted,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auction => "auction",
            Self::Active => "active",
            Self::Repaid => "repaid",
            Self::Defaulted => "defaulted",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of bids placed on a loan.
///
/// The contract only started counting bids partway through its life, so a
/// loan can report zero bids while holding a current bid. That case is
/// `Unknown`, serialized as `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BidCount {
    Known(u64),
    Unknown,
}

impl BidCount {
    /// Resolve the reported count against whether a bid is currently held
    pub fn resolve(reported: u64, has_current_bid: bool) -> Self {
        if reported == 0 && has_current_bid {
            Self::Unknown
        } else {
            Self::Known(reported)
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Known(n) => *n as i64,
            Self::Unknown => -1,
        }
    }
}

impl Default for BidCount {
    fn default() -> Self {
        Self::Known(0)
    }
}

impl Serialize for BidCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

/// Highest bid on an auction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBid {
    /// Repayment amount bid, raw units of the borrow asset
    pub amount_raw: u128,
    /// Display units
    pub amount: f64,
    pub bidder: Option<String>,
}

/// Read-only metrics derived from the raw loan terms
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanMetrics {
    /// `maturity - auction end`, when both are set
    pub duration_blocks: Option<u64>,
    /// Whole days in the loan term
    pub duration_days: Option<u64>,
    /// Interest percent if repaid at `max-repayment`
    pub max_interest_rate: Option<f64>,
    /// Interest percent at the current bid or agreed repayment
    pub current_interest_rate: Option<f64>,
    pub max_apy: Option<f64>,
    pub current_apy: Option<f64>,
}

/// One loan as mirrored from the contract
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub id: LoanId,
    pub collateral_asset: String,
    pub borrow_asset: String,

    /// Raw amounts in each asset's smallest unit
    pub collateral_amount_raw: u128,
    pub borrow_amount_raw: u128,
    pub max_repayment_raw: u128,
    pub repayment_amount_raw: u128,

    /// Display amounts
    pub collateral_amount: f64,
    pub borrow_amount: f64,
    pub max_repayment: f64,
    pub repayment_amount: f64,

    pub auction_end_block: BlockHeight,
    pub maturity_block: BlockHeight,
    pub status: LoanStatus,

    pub borrower_address: Option<String>,
    /// Set once an auction is finalized
    pub lender_address: Option<String>,

    /// Present only while the loan is in auction and has a bid
    pub current_bid: Option<CurrentBid>,
    pub bid_count: BidCount,

    #[serde(flatten)]
    pub metrics: LoanMetrics,
}

impl LoanRecord {
    pub fn is_auction(&self) -> bool {
        self.status == LoanStatus::Auction
    }

    pub fn bidder_address(&self) -> Option<&str> {
        self.current_bid.as_ref().and_then(|b| b.bidder.as_deref())
    }

    /// Auction still accepting bids at `height`
    pub fn is_live_auction(&self, height: BlockHeight) -> bool {
        self.is_auction() && self.auction_end_block > height
    }

    /// Auction past its end block but not yet finalized
    pub fn is_ended_auction(&self, height: BlockHeight) -> bool {
        self.is_auction() && self.auction_end_block > 0 && self.auction_end_block <= height
    }
}

/// Outcome counts of a refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    /// Ids requested (the contract's loan nonce)
    pub attempted: u64,
    pub loaded: u64,
    pub failed: u64,
    /// Ids the contract reported as absent
    pub absent: u64,
    pub live_auctions: u64,
    pub ended_auctions: u64,
    pub active: u64,
    pub repaid: u64,
    /// Loans with the `defaulted` or `failed` status
    pub defaulted: u64,
}

impl RefreshSummary {
    /// Tally status categories over the loaded records
    pub fn tally(&mut self, records: &[LoanRecord], height: BlockHeight) {
        self.live_auctions = records.iter().filter(|r| r.is_live_auction(height)).count() as u64;
        self.ended_auctions = records.iter().filter(|r| r.is_ended_auction(height)).count() as u64;
        self.active = count_status(records, LoanStatus::Active);
        self.repaid = count_status(records, LoanStatus::Repaid);
        self.defaulted = records
            .iter()
            .filter(|r| matches!(r.status, LoanStatus::Defaulted | LoanStatus::Failed))
            .count() as u64;
    }

    /// User-facing summary line
    pub fn message(&self) -> String {
        if self.attempted == 0 {
            return "No loans created yet".to_string();
        }
        if self.loaded == 0 {
            return format!("Checked {} loans - none found", self.attempted);
        }
        format!(
            "Found {} loan(s) - {} active auctions, {} ended, {} active, {} defaulted, {} repaid",
            self.loaded,
            self.live_auctions,
            self.ended_auctions,
            self.active,
            self.defaulted,
            self.repaid
        )
    }
}

fn count_status(records: &[LoanRecord], status: LoanStatus) -> u64 {
    records.iter().filter(|r| r.status == status).count() as u64
}

/// Immutable result of one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSnapshot {
    /// Sorted by id
    pub records: Vec<LoanRecord>,
    /// Chain height used for time-relative fields
    pub block_height: BlockHeight,
    /// Unix seconds
    pub fetched_at: u64,
    pub summary: RefreshSummary,
}

impl LoanSnapshot {
    pub fn empty(block_height: BlockHeight, fetched_at: u64) -> Self {
        Self {
            records: Vec::new(),
            block_height,
            fetched_at,
            summary: RefreshSummary::default(),
        }
    }

    pub fn get(&self, id: LoanId) -> Option<&LoanRecord> {
        self.records
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|i| &self.records[i])
    }
}

/// A borrower or lender position listed for sale
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub loan_id: LoanId,
    /// `borrower` or `lender`
    pub position_type: String,
    pub seller: Option<String>,
    pub asking_price: Option<f64>,
    pub offer_count: u64,
    pub status: LoanStatus,
    pub collateral_amount: f64,
    pub borrow_amount: f64,
    pub max_repayment: f64,
    pub duration_blocks: Option<u64>,
    pub maturity_block: BlockHeight,
}

/// An offer on a listed position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub loan_id: LoanId,
    pub offer_id: u64,
    pub position_type: String,
    pub buyer: Option<String>,
    pub amount: f64,
    pub asking_price: Option<f64>,
    pub status: String,
    pub counter_amount: Option<f64>,
}

/// An active loan in which an account holds a position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub loan: LoanRecord,
    pub owns_borrower_position: bool,
    pub owns_lender_position: bool,
    /// False when ownership came from address equality because the
    /// ownership calls failed or disagreed
    pub verified: bool,
}
