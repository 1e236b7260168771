//! Sorted and filtered views over a snapshot
//!
//! Views never touch the snapshot; they copy out the matching records.

use std::cmp::Ordering;
use std::str::FromStr;

use lendscope_core::BlockHeight;
use serde::{Deserialize, Serialize};

use crate::calculator::time_remaining;
use crate::state::{LoanRecord, LoanSnapshot, LoanStatus};

/// Column to sort by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Id,
    CollateralAmount,
    BorrowAmount,
    MaxRepayment,
    CurrentBid,
    AuctionEnd,
    Maturity,
    Duration,
    MaxInterest,
    CurrentInterest,
    MaxApy,
    CurrentApy,
    TimeRemaining,
    BidCount,
    Status,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown sort key '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Which address on a loan counts as "mine"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Borrower,
    Lender,
    Bidder,
    #[default]
    Any,
}

/// Whether `account` holds `role` on `record`. Plain string equality.
pub fn is_mine(record: &LoanRecord, account: &str, role: Role) -> bool {
    let borrower = record.borrower_address.as_deref() == Some(account);
    let lender = record.lender_address.as_deref() == Some(account);
    let bidder = record.bidder_address() == Some(account);

    match role {
        Role::Borrower => borrower,
        Role::Lender => lender,
        Role::Bidder => bidder,
        Role::Any => borrower || lender || bidder,
    }
}

fn cmp_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    // absent sorts before any value
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(a: &LoanRecord, b: &LoanRecord, key: SortKey, height: BlockHeight) -> Ordering {
    match key {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::CollateralAmount => a.collateral_amount.total_cmp(&b.collateral_amount),
        SortKey::BorrowAmount => a.borrow_amount.total_cmp(&b.borrow_amount),
        SortKey::MaxRepayment => a.max_repayment.total_cmp(&b.max_repayment),
        SortKey::CurrentBid => cmp_f64(
            a.current_bid.as_ref().map(|bid| bid.amount),
            b.current_bid.as_ref().map(|bid| bid.amount),
        ),
        SortKey::AuctionEnd => a.auction_end_block.cmp(&b.auction_end_block),
        SortKey::Maturity => a.maturity_block.cmp(&b.maturity_block),
        SortKey::Duration => a.metrics.duration_blocks.cmp(&b.metrics.duration_blocks),
        SortKey::MaxInterest => cmp_f64(a.metrics.max_interest_rate, b.metrics.max_interest_rate),
        SortKey::CurrentInterest => cmp_f64(
            a.metrics.current_interest_rate,
            b.metrics.current_interest_rate,
        ),
        SortKey::MaxApy => cmp_f64(a.metrics.max_apy, b.metrics.max_apy),
        SortKey::CurrentApy => cmp_f64(a.metrics.current_apy, b.metrics.current_apy),
        SortKey::TimeRemaining => time_remaining(a, height).cmp(&time_remaining(b, height)),
        SortKey::BidCount => a.bid_count.as_i64().cmp(&b.bid_count.as_i64()),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

/// Stable sort: records with equal keys keep their relative order in both
/// directions.
pub fn sort_records(
    records: &mut [LoanRecord],
    key: SortKey,
    direction: SortDirection,
    height: BlockHeight,
) {
    match direction {
        SortDirection::Asc => records.sort_by(|a, b| compare(a, b, key, height)),
        SortDirection::Desc => records.sort_by(|a, b| compare(b, a, key, height)),
    }
}

/// Filters and ordering applied to a snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanQuery {
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
    pub status: Option<LoanStatus>,
    /// Only loans where this account holds `role`
    pub account: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl LoanQuery {
    pub fn matches(&self, record: &LoanRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        match &self.account {
            Some(account) => is_mine(record, account, self.role),
            None => true,
        }
    }

    pub fn apply(&self, snapshot: &LoanSnapshot) -> Vec<LoanRecord> {
        let mut out: Vec<LoanRecord> = snapshot
            .records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        sort_records(&mut out, self.sort, self.direction, snapshot.block_height);
        out
    }
}
