//! Loan discovery via read-only contract calls
//!
//! Loans are numbered 1..=N by the contract's loan nonce. A refresh reads
//! every id in fixed-size batches: batches run one after another, the ids
//! inside a batch are fetched concurrently. A failed id is counted and
//! skipped; the refresh only fails outright when nothing could be loaded.

use std::ops::RangeInclusive;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clarity_codec::{
    decode_hex, find_account_principal, find_ascii_string, find_optional_principal,
    find_unsigned_int, uint_arg, ClarityValue, TupleFields,
};
use futures::future::join_all;
use lendscope_core::{AppConfig, AssetConfig, LoanId, ProtocolError};
use stacks_node_client::{queries, NodeClient};

use crate::calculator::{compute_metrics, to_display};
use crate::constants::{bid_field, loan_field, loan_fn};
use crate::state::{BidCount, CurrentBid, LoanRecord, LoanSnapshot, LoanStatus, RefreshSummary};

/// Fail with `NotInitialized` unless the loan contract reports it is set up
pub async fn check_initialized(
    client: &NodeClient,
    config: &AppConfig,
) -> Result<(), ProtocolError> {
    let contract = config.contracts.loan_contract();
    let ready = queries::read_bool(
        client,
        &contract,
        loan_fn::IS_INITIALIZED,
        config.contracts.sender(),
        &[],
    )
    .await?;

    if !ready {
        return Err(ProtocolError::NotInitialized {
            contract: contract.to_string(),
        });
    }
    Ok(())
}

/// Number of loans ever created (the highest assigned id)
pub async fn get_total_record_count(
    client: &NodeClient,
    config: &AppConfig,
) -> Result<u64, ProtocolError> {
    let contract = config.contracts.loan_contract();
    let nonce = queries::read_uint(
        client,
        &contract,
        loan_fn::GET_LOAN_NONCE,
        config.contracts.sender(),
        &[],
    )
    .await?
    .unwrap_or(0);

    u64::try_from(nonce).map_err(|_| ProtocolError::DecodeAnomaly {
        context: loan_fn::GET_LOAN_NONCE.to_string(),
        reason: format!("loan nonce {} out of range", nonce),
    })
}

/// Raw hex of one loan tuple, `None` if the contract has no such loan
pub async fn get_record(
    client: &NodeClient,
    config: &AppConfig,
    id: LoanId,
) -> Result<Option<String>, ProtocolError> {
    let contract = config.contracts.loan_contract();
    let hex = client
        .call_read_only(
            &contract,
            loan_fn::GET_LOAN,
            config.contracts.sender(),
            &[uint_arg(id as u128)],
        )
        .await?;
    Ok(hex)
}

/// Fetch, decode and enrich one loan.
///
/// The bid and bid-count reads are best effort: a failure there leaves the
/// loan without a bid rather than failing it.
pub async fn fetch_loan(
    client: &NodeClient,
    config: &AppConfig,
    id: LoanId,
) -> Result<Option<LoanRecord>, ProtocolError> {
    let hex = get_record(client, config, id)
        .await
        .map_err(|e| ProtocolError::RecordFetchFailed {
            id,
            reason: e.to_string(),
        })?;

    let Some(hex) = hex else {
        return Ok(None);
    };

    let value = decode_hex(&hex).map_err(|e| ProtocolError::RecordFetchFailed {
        id,
        reason: format!("undecodable loan value: {}", e),
    })?;

    if value.unwrap_some_ok().is_none() {
        return Ok(None);
    }
    if TupleFields::from_value(&value).is_none() {
        return Err(ProtocolError::RecordFetchFailed {
            id,
            reason: format!("expected a tuple, got {}", value.type_name()),
        });
    }

    let mut record = parse_loan(id, &value, &config.assets);

    if record.is_auction() {
        record.current_bid = match fetch_current_bid(client, config, id, &record.borrow_asset).await
        {
            Ok(bid) => bid,
            Err(e) => {
                tracing::warn!(loan_id = id, error = %e, "Failed to fetch current bid");
                None
            }
        };
    }

    let reported = match fetch_bid_count(client, config, id).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(loan_id = id, error = %e, "Failed to fetch bid count");
            0
        }
    };
    record.bid_count = BidCount::resolve(reported, record.current_bid.is_some());
    record.metrics = compute_metrics(&record, config.assets.blocks_per_day);

    Ok(Some(record))
}

/// Build a record from a decoded `get-loan` tuple.
///
/// Missing fields read as zero/empty. Loans created before the asset fields
/// existed get the configured default assets.
pub fn parse_loan(id: LoanId, tuple: &ClarityValue, assets: &AssetConfig) -> LoanRecord {
    let collateral_asset = asset_or(
        find_ascii_string(tuple, loan_field::COLLATERAL_ASSET),
        &assets.default_collateral_asset,
    );
    let borrow_asset = asset_or(
        find_ascii_string(tuple, loan_field::BORROW_ASSET),
        &assets.default_borrow_asset,
    );

    let collateral_decimals = assets.decimals_for(&collateral_asset);
    let borrow_decimals = assets.decimals_for(&borrow_asset);

    let collateral_amount_raw = find_unsigned_int(tuple, loan_field::COLLATERAL_AMOUNT);
    let borrow_amount_raw = find_unsigned_int(tuple, loan_field::BORROW_AMOUNT);
    let max_repayment_raw = find_unsigned_int(tuple, loan_field::MAX_REPAYMENT);
    let repayment_amount_raw = find_unsigned_int(tuple, loan_field::REPAYMENT_AMOUNT);

    LoanRecord {
        id,
        collateral_amount: to_display(collateral_amount_raw, collateral_decimals),
        borrow_amount: to_display(borrow_amount_raw, borrow_decimals),
        max_repayment: to_display(max_repayment_raw, borrow_decimals),
        repayment_amount: to_display(repayment_amount_raw, borrow_decimals),
        collateral_amount_raw,
        borrow_amount_raw,
        max_repayment_raw,
        repayment_amount_raw,
        collateral_asset,
        borrow_asset,
        auction_end_block: height(find_unsigned_int(tuple, loan_field::AUCTION_END_BLOCK)),
        maturity_block: height(find_unsigned_int(tuple, loan_field::MATURITY_BLOCK)),
        status: LoanStatus::from_tag(&find_ascii_string(tuple, loan_field::STATUS)),
        borrower_address: find_account_principal(tuple, loan_field::BORROWER),
        lender_address: find_optional_principal(tuple, loan_field::LENDER),
        current_bid: None,
        bid_count: BidCount::default(),
        metrics: Default::default(),
    }
}

/// Build a bid from a decoded `get-current-bid` tuple
pub fn parse_bid(tuple: &ClarityValue, decimals: u32) -> Option<CurrentBid> {
    TupleFields::from_value(tuple)?;

    let amount_raw = find_unsigned_int(tuple, bid_field::AMOUNT);
    let bidder = find_account_principal(tuple, bid_field::BIDDER);
    if amount_raw == 0 && bidder.is_none() {
        return None;
    }

    Some(CurrentBid {
        amount_raw,
        amount: to_display(amount_raw, decimals),
        bidder,
    })
}

async fn fetch_current_bid(
    client: &NodeClient,
    config: &AppConfig,
    id: LoanId,
    borrow_asset: &str,
) -> Result<Option<CurrentBid>, ProtocolError> {
    let value = queries::read_value(
        client,
        &config.contracts.loan_contract(),
        loan_fn::GET_CURRENT_BID,
        config.contracts.sender(),
        &[uint_arg(id as u128)],
    )
    .await?;

    let decimals = config.assets.decimals_for(borrow_asset);
    Ok(value.and_then(|v| parse_bid(&v, decimals)))
}

async fn fetch_bid_count(
    client: &NodeClient,
    config: &AppConfig,
    id: LoanId,
) -> Result<u64, ProtocolError> {
    let count = queries::read_uint(
        client,
        &config.contracts.loan_contract(),
        loan_fn::GET_BID_COUNT,
        config.contracts.sender(),
        &[uint_arg(id as u128)],
    )
    .await?
    .unwrap_or(0);
    Ok(u64::try_from(count).unwrap_or(u64::MAX))
}

/// Split `1..=total` into consecutive ranges of at most `batch_size` ids
pub fn batch_ranges(total: u64, batch_size: u64) -> Vec<RangeInclusive<u64>> {
    let size = batch_size.max(1);
    let mut ranges = Vec::new();
    let mut start = 1;
    while start <= total {
        let end = total.min(start + size - 1);
        ranges.push(start..=end);
        start = end + 1;
    }
    ranges
}

/// Run a full refresh cycle and build a new snapshot.
///
/// Order: chain height, initialization check, loan count, batched loan
/// reads, then a second height read for the time-relative fields.
pub async fn refresh_loans(
    client: &NodeClient,
    config: &AppConfig,
) -> Result<LoanSnapshot, ProtocolError> {
    let started = Instant::now();
    let first_height = client.burn_block_height().await?;

    check_initialized(client, config).await?;

    let total = get_total_record_count(client, config).await?;
    if total == 0 {
        tracing::info!("No loans created yet");
        return Ok(LoanSnapshot::empty(first_height, unix_now()));
    }

    let ranges = batch_ranges(total, config.fetch.batch_size);
    tracing::info!(
        total,
        batches = ranges.len(),
        batch_size = config.fetch.batch_size,
        "Fetching loans"
    );

    let mut summary = RefreshSummary {
        attempted: total,
        ..Default::default()
    };
    let mut records = Vec::with_capacity(total.min(10_000) as usize);

    for (index, range) in ranges.iter().enumerate() {
        let results = join_all(range.clone().map(|id| fetch_loan(client, config, id))).await;

        for (id, result) in range.clone().zip(results) {
            match result {
                Ok(Some(record)) => {
                    summary.loaded += 1;
                    records.push(record);
                }
                Ok(None) => {
                    summary.absent += 1;
                    tracing::debug!(loan_id = id, "Loan absent, skipping");
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(loan_id = id, error = %e, "Failed to load loan");
                }
            }
        }

        tracing::info!(
            batch = index + 1,
            batches = ranges.len(),
            through = *range.end(),
            total,
            loaded = summary.loaded,
            failed = summary.failed,
            "Batch complete"
        );
    }

    if summary.loaded == 0 && summary.failed > 0 {
        return Err(ProtocolError::NoRecordsLoaded {
            attempted: total,
            failed: summary.failed,
        });
    }

    let block_height = match client.burn_block_height().await {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(error = %e, first_height, "Second height read failed, reusing first");
            first_height
        }
    };

    records.sort_by_key(|r| r.id);
    summary.tally(&records, block_height);

    tracing::info!(
        loaded = summary.loaded,
        failed = summary.failed,
        absent = summary.absent,
        block_height,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "{}",
        summary.message()
    );

    Ok(LoanSnapshot {
        records,
        block_height,
        fetched_at: unix_now(),
        summary,
    })
}

fn asset_or(symbol: String, default: &str) -> String {
    if symbol.is_empty() {
        default.to_string()
    } else {
        symbol
    }
}

fn height(raw: u128) -> u64 {
    u64::try_from(raw).unwrap_or(u64::MAX)
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
