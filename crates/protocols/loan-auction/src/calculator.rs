//! Loan metric calculations

use lendscope_core::constants::DAYS_PER_YEAR;
use lendscope_core::BlockHeight;

use crate::state::{LoanMetrics, LoanRecord, LoanStatus};

/// Shift a raw integer amount into display units
pub fn to_display(raw: u128, decimals: u32) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// Loan term in blocks. `None` until both heights are set.
pub fn duration_blocks(auction_end: BlockHeight, maturity: BlockHeight) -> Option<u64> {
    if auction_end == 0 || maturity == 0 {
        return None;
    }
    maturity.checked_sub(auction_end)
}

/// Whole days in a block count
pub fn blocks_to_days(blocks: u64, blocks_per_day: u64) -> u64 {
    if blocks_per_day == 0 {
        return 0;
    }
    blocks / blocks_per_day
}

/// Interest as a percentage of principal.
/// Returns e.g. 5.0 for 5% interest, `None` for zero principal.
pub fn calculate_interest_percent(principal: u128, repayment: u128) -> Option<f64> {
    if principal == 0 {
        return None;
    }
    Some((repayment as f64 - principal as f64) / principal as f64 * 100.0)
}

/// Annualize an interest percentage over a term in whole days.
/// Undefined for terms under one day.
pub fn calculate_apy(interest_percent: f64, days: u64) -> Option<f64> {
    if days == 0 {
        return None;
    }
    Some(interest_percent * DAYS_PER_YEAR / days as f64)
}

/// Amount the current interest is measured against: the leading bid while
/// in auction, the agreed repayment once active. Zero means not yet known.
fn current_repayment(record: &LoanRecord) -> Option<u128> {
    let amount = match record.status {
        LoanStatus::Auction => record.current_bid.as_ref()?.amount_raw,
        LoanStatus::Active | LoanStatus::Repaid | LoanStatus::Defaulted | LoanStatus::Failed => {
            record.repayment_amount_raw
        }
        LoanStatus::Unknown => return None,
    };
    (amount > 0).then_some(amount)
}

/// Derive duration, interest and APY from a record's raw terms
pub fn compute_metrics(record: &LoanRecord, blocks_per_day: u64) -> LoanMetrics {
    let duration_blocks = duration_blocks(record.auction_end_block, record.maturity_block);
    let duration_days = duration_blocks.map(|b| blocks_to_days(b, blocks_per_day));

    let max_interest_rate = if record.max_repayment_raw > 0 {
        calculate_interest_percent(record.borrow_amount_raw, record.max_repayment_raw)
    } else {
        None
    };
    let current_interest_rate = current_repayment(record)
        .and_then(|repay| calculate_interest_percent(record.borrow_amount_raw, repay));

    let annualize = |rate: Option<f64>| match (rate, duration_days) {
        (Some(rate), Some(days)) => calculate_apy(rate, days),
        _ => None,
    };

    LoanMetrics {
        duration_blocks,
        duration_days,
        max_interest_rate,
        current_interest_rate,
        max_apy: annualize(max_interest_rate),
        current_apy: annualize(current_interest_rate),
    }
}

/// Blocks until `target`; negative once passed
pub fn blocks_remaining(target: BlockHeight, height: BlockHeight) -> i64 {
    // saturates instead of wrapping for heights beyond i64
    if target >= height {
        i64::try_from(target - height).unwrap_or(i64::MAX)
    } else {
        i64::try_from(height - target).map(|d| -d).unwrap_or(i64::MIN)
    }
}

/// Blocks until the record's next deadline: auction end while in auction,
/// maturity while active. `None` for settled loans.
pub fn time_remaining(record: &LoanRecord, height: BlockHeight) -> Option<i64> {
    match record.status {
        LoanStatus::Auction => Some(blocks_remaining(record.auction_end_block, height)),
        LoanStatus::Active => Some(blocks_remaining(record.maturity_block, height)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{BidCount, CurrentBid};

    fn loan(status: LoanStatus) -> LoanRecord {
        LoanRecord {
            id: 1,
            collateral_asset: "BTC".into(),
            borrow_asset: "USDT".into(),
            collateral_amount_raw: 100_000_000,
            borrow_amount_raw: 50_000_000,
            max_repayment_raw: 55_000_000,
            repayment_amount_raw: 0,
            collateral_amount: 1.0,
            borrow_amount: 50.0,
            max_repayment: 55.0,
            repayment_amount: 0.0,
            auction_end_block: 1_000,
            maturity_block: 1_000 + 144 * 30,
            status,
            borrower_address: None,
            lender_address: None,
            current_bid: None,
            bid_count: BidCount::default(),
            metrics: LoanMetrics::default(),
        }
    }

    #[test]
    fn test_display_scaling() {
        assert_eq!(to_display(100_000_000, 8), 1.0);
        assert_eq!(to_display(50_000_000, 6), 50.0);
        assert_eq!(to_display(0, 6), 0.0);
    }

    #[test]
    fn test_interest_percent() {
        // 50 borrowed, 55 repaid -> 10%
        let interest = calculate_interest_percent(50_000_000, 55_000_000).unwrap();
        assert!((interest - 10.0).abs() < 1e-9);
        assert_eq!(calculate_interest_percent(0, 100), None);
    }

    #[test]
    fn test_apy_30_days() {
        let apy = calculate_apy(10.0, 30).unwrap();
        assert!((apy - 121.666).abs() < 0.01, "APY was {}", apy);
        assert_eq!(calculate_apy(10.0, 0), None);
    }

    #[test]
    fn test_duration_requires_both_heights() {
        assert_eq!(duration_blocks(100, 388), Some(288));
        assert_eq!(duration_blocks(0, 388), None);
        assert_eq!(duration_blocks(100, 0), None);
        assert_eq!(duration_blocks(500, 100), None);
        assert_eq!(blocks_to_days(287, 144), 1);
        assert_eq!(blocks_to_days(143, 144), 0);
    }

    #[test]
    fn test_metrics_for_auction_without_bid() {
        let m = compute_metrics(&loan(LoanStatus::Auction), 144);
        assert_eq!(m.duration_days, Some(30));
        assert!(m.max_interest_rate.is_some());
        assert_eq!(m.current_interest_rate, None);
        assert_eq!(m.current_apy, None);
    }

    #[test]
    fn test_metrics_for_auction_with_bid() {
        let mut r = loan(LoanStatus::Auction);
        r.current_bid = Some(CurrentBid {
            amount_raw: 52_500_000,
            amount: 52.5,
            bidder: None,
        });
        let m = compute_metrics(&r, 144);
        assert!((m.current_interest_rate.unwrap() - 5.0).abs() < 1e-9);
        assert!((m.current_apy.unwrap() - 5.0 * 365.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_for_active_use_repayment() {
        let mut r = loan(LoanStatus::Active);
        r.repayment_amount_raw = 53_000_000;
        let m = compute_metrics(&r, 144);
        assert!((m.current_interest_rate.unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_apy_undefined_for_sub_day_term() {
        let mut r = loan(LoanStatus::Auction);
        r.maturity_block = r.auction_end_block + 100;
        let m = compute_metrics(&r, 144);
        assert_eq!(m.duration_days, Some(0));
        assert_eq!(m.max_apy, None);
    }

    #[test]
    fn test_metrics_are_deterministic() {
        let r = loan(LoanStatus::Active);
        assert_eq!(compute_metrics(&r, 144), compute_metrics(&r, 144));
    }

    #[test]
    fn test_time_remaining() {
        let r = loan(LoanStatus::Auction);
        assert_eq!(time_remaining(&r, 900), Some(100));
        assert_eq!(time_remaining(&r, 1_100), Some(-100));
        assert_eq!(time_remaining(&loan(LoanStatus::Repaid), 900), None);
    }

    #[test]
    fn test_blocks_remaining_saturates_at_extreme_heights() {
        assert_eq!(blocks_remaining(u64::MAX, 0), i64::MAX);
        assert_eq!(blocks_remaining(0, u64::MAX), i64::MIN);
        assert_eq!(blocks_remaining(u64::MAX, u64::MAX - 5), 5);
        assert_eq!(blocks_remaining(u64::MAX - 5, u64::MAX), -5);
        assert_eq!(blocks_remaining(i64::MAX as u64 + 1, 0), i64::MAX);
    }
}
