//! Position ownership scan
//!
//! Borrower and lender positions are NFTs, so the addresses stored on a loan
//! can go stale once a position is sold. The scan asks the contract who owns
//! each side of every active loan. When those calls fail, the stored
//! addresses are used instead and the position is marked unverified.

use std::time::Duration;

use clarity_codec::{c32_address_decode, principal_arg, uint_arg};
use lendscope_core::{AppConfig, Network, ProtocolError};
use stacks_node_client::{queries, NodeClient};

use crate::constants::loan_fn;
use crate::state::{LoanRecord, LoanSnapshot, LoanStatus, Position};

/// Decode and network-check an account address
pub fn parse_account(address: &str, network: Network) -> Result<(u8, [u8; 20]), ProtocolError> {
    let (version, hash160) =
        c32_address_decode(address).map_err(|e| ProtocolError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

    if !network.accepts_version(version) {
        return Err(ProtocolError::InvalidAddress {
            address: address.to_string(),
            reason: format!("not a {} address", network),
        });
    }
    Ok((version, hash160))
}

async fn check_owner(
    client: &NodeClient,
    config: &AppConfig,
    function: &str,
    record: &LoanRecord,
    account_arg: &str,
) -> Option<bool> {
    let args = [uint_arg(record.id as u128), account_arg.to_string()];
    match queries::read_bool(
        client,
        &config.contracts.loan_contract(),
        function,
        config.contracts.sender(),
        &args,
    )
    .await
    {
        Ok(owns) => Some(owns),
        Err(e) => {
            tracing::warn!(loan_id = record.id, function, error = %e, "Ownership check failed");
            None
        }
    }
}

/// Combine ownership answers with the stored addresses.
///
/// A confirmed owner wins. Otherwise a matching stored address still yields
/// a position, flagged as unverified.
fn resolve_position(
    record: &LoanRecord,
    account: &str,
    owns_borrower: Option<bool>,
    owns_lender: Option<bool>,
) -> Option<Position> {
    let borrower = owns_borrower.unwrap_or(false);
    let lender = owns_lender.unwrap_or(false);

    if borrower || lender {
        return Some(Position {
            loan: record.clone(),
            owns_borrower_position: borrower,
            owns_lender_position: lender,
            verified: true,
        });
    }

    let address_borrower = record.borrower_address.as_deref() == Some(account);
    let address_lender = record.lender_address.as_deref() == Some(account);
    if address_borrower || address_lender {
        tracing::warn!(
            loan_id = record.id,
            "Address matches but ownership was not confirmed, adding unverified"
        );
        return Some(Position {
            loan: record.clone(),
            owns_borrower_position: address_borrower,
            owns_lender_position: address_lender,
            verified: false,
        });
    }

    None
}

/// Active loans in which `account` holds the borrower or lender position.
///
/// Loans are checked one at a time with a pause between them; both sides of
/// a loan are checked concurrently.
pub async fn scan_positions(
    client: &NodeClient,
    config: &AppConfig,
    snapshot: &LoanSnapshot,
    account: &str,
) -> Result<Vec<Position>, ProtocolError> {
    let (version, hash160) = parse_account(account, config.network)?;
    let account_arg = principal_arg(version, hash160);
    let delay = Duration::from_millis(config.fetch.position_check_delay_ms);

    let active: Vec<&LoanRecord> = snapshot
        .records
        .iter()
        .filter(|r| r.status == LoanStatus::Active)
        .collect();

    let mut positions = Vec::new();
    for (i, record) in active.iter().enumerate() {
        let (owns_borrower, owns_lender) = futures::join!(
            check_owner(client, config, loan_fn::IS_BORROWER_OWNER, record, &account_arg),
            check_owner(client, config, loan_fn::IS_LENDER_OWNER, record, &account_arg),
        );

        if let Some(position) = resolve_position(record, account, owns_borrower, owns_lender) {
            positions.push(position);
        }

        if i + 1 < active.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::info!(
        positions = positions.len(),
        checked = active.len(),
        "Position scan complete"
    );
    Ok(positions)
}
