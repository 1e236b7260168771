//! Position marketplace mirror
//!
//! Borrower and lender positions can be listed for sale and receive offers.
//! Listings and offers live in a separate contract keyed by loan id; the
//! loan terms shown next to them come from the current snapshot.

use std::collections::HashMap;

use clarity_codec::{
    find_account_principal, find_ascii_string, find_unsigned_int, uint_arg, ClarityValue,
    TupleFields,
};
use lendscope_core::{AppConfig, LoanId, ProtocolError};
use stacks_node_client::{queries, NodeClient};

use crate::calculator::to_display;
use crate::constants::{market_field, market_fn};
use crate::positions::parse_account;
use crate::state::{Listing, LoanRecord, LoanSnapshot, Offer};

/// `uint` or `(some uint)`; `None` for `none` or a missing field
fn optional_uint(tuple: &ClarityValue, field: &str) -> Option<u128> {
    match TupleFields::from_value(tuple)?.get(field)? {
        ClarityValue::UInt(v) => Some(*v),
        ClarityValue::OptionalSome(inner) => inner.as_uint(),
        _ => None,
    }
}

/// Listing terms decoded from `get-listing`
#[derive(Debug, Clone, PartialEq)]
struct ListingTerms {
    position_type: String,
    seller: Option<String>,
    asking_price_raw: Option<u128>,
}

fn parse_listing(tuple: &ClarityValue) -> ListingTerms {
    let position_type = find_ascii_string(tuple, market_field::POSITION_TYPE);
    ListingTerms {
        position_type: if position_type.is_empty() {
            "unknown".to_string()
        } else {
            position_type
        },
        seller: find_account_principal(tuple, market_field::SELLER),
        asking_price_raw: optional_uint(tuple, market_field::ASKING_PRICE),
    }
}

fn parse_offer(
    loan_id: LoanId,
    offer_id: u64,
    tuple: &ClarityValue,
    terms: Option<&ListingTerms>,
    decimals: u32,
) -> Offer {
    Offer {
        loan_id,
        offer_id,
        position_type: terms
            .map(|t| t.position_type.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        buyer: find_account_principal(tuple, market_field::BUYER),
        amount: to_display(find_unsigned_int(tuple, market_field::AMOUNT), decimals),
        asking_price: terms
            .and_then(|t| t.asking_price_raw)
            .map(|p| to_display(p, decimals)),
        status: find_ascii_string(tuple, market_field::STATUS),
        counter_amount: optional_uint(tuple, market_field::COUNTER_AMOUNT)
            .map(|c| to_display(c, decimals)),
    }
}

async fn read_listing(
    client: &NodeClient,
    config: &AppConfig,
    loan_id: LoanId,
) -> Result<Option<ListingTerms>, ProtocolError> {
    let value = queries::read_value(
        client,
        &config.contracts.marketplace_contract(),
        market_fn::GET_LISTING,
        config.contracts.sender(),
        &[uint_arg(loan_id as u128)],
    )
    .await?;
    Ok(value.map(|v| parse_listing(&v)))
}

async fn read_offer_count(
    client: &NodeClient,
    config: &AppConfig,
    loan_id: LoanId,
) -> Result<u64, ProtocolError> {
    let count = queries::read_uint(
        client,
        &config.contracts.marketplace_contract(),
        market_fn::GET_OFFER_NONCE,
        config.contracts.sender(),
        &[uint_arg(loan_id as u128)],
    )
    .await?
    .unwrap_or(0);
    Ok(u64::try_from(count).unwrap_or(u64::MAX))
}

fn listing_for(record: &LoanRecord, terms: ListingTerms, offer_count: u64, decimals: u32) -> Listing {
    Listing {
        loan_id: record.id,
        position_type: terms.position_type,
        seller: terms.seller,
        asking_price: terms.asking_price_raw.map(|p| to_display(p, decimals)),
        offer_count,
        status: record.status,
        collateral_amount: record.collateral_amount,
        borrow_amount: record.borrow_amount,
        max_repayment: record.max_repayment,
        duration_blocks: record.metrics.duration_blocks,
        maturity_block: record.maturity_block,
    }
}

/// Every listed position among the snapshot's loans
pub async fn fetch_listings(
    client: &NodeClient,
    config: &AppConfig,
    snapshot: &LoanSnapshot,
) -> Result<Vec<Listing>, ProtocolError> {
    let mut listings = Vec::new();

    for record in &snapshot.records {
        let terms = match read_listing(client, config, record.id).await {
            Ok(Some(terms)) => terms,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(loan_id = record.id, error = %e, "Failed to read listing");
                continue;
            }
        };

        let offer_count = match read_offer_count(client, config, record.id).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(loan_id = record.id, error = %e, "Failed to read offer count");
                0
            }
        };

        let decimals = config.assets.decimals_for(&record.borrow_asset);
        listings.push(listing_for(record, terms, offer_count, decimals));
    }

    tracing::info!(
        listings = listings.len(),
        loans = snapshot.records.len(),
        "Marketplace listings fetched"
    );
    Ok(listings)
}

/// Offers placed by `buyer` on any of the snapshot's loans
pub async fn fetch_offers_by(
    client: &NodeClient,
    config: &AppConfig,
    snapshot: &LoanSnapshot,
    buyer: &str,
) -> Result<Vec<Offer>, ProtocolError> {
    parse_account(buyer, config.network)?;

    let contract = config.contracts.marketplace_contract();
    let mut listing_cache: HashMap<LoanId, Option<ListingTerms>> = HashMap::new();
    let mut offers = Vec::new();

    for record in &snapshot.records {
        let count = match read_offer_count(client, config, record.id).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(loan_id = record.id, error = %e, "Failed to read offer count");
                continue;
            }
        };
        let limit = config.fetch.max_offers_per_loan;
        if count > limit {
            tracing::warn!(
                loan_id = record.id,
                count,
                limit,
                "Offer nonce exceeds the per-loan limit, reading the first offers only"
            );
        }
        let decimals = config.assets.decimals_for(&record.borrow_asset);

        for offer_id in 1..=count.min(limit) {
            let value = match queries::read_value(
                client,
                &contract,
                market_fn::GET_OFFER,
                config.contracts.sender(),
                &[uint_arg(record.id as u128), uint_arg(offer_id as u128)],
            )
            .await
            {
                Ok(Some(v)) => v,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(loan_id = record.id, offer_id, error = %e, "Failed to read offer");
                    continue;
                }
            };

            if find_account_principal(&value, market_field::BUYER).as_deref() != Some(buyer) {
                continue;
            }

            if !listing_cache.contains_key(&record.id) {
                let terms = read_listing(client, config, record.id)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::debug!(loan_id = record.id, error = %e, "Listing unavailable for offer");
                        None
                    });
                listing_cache.insert(record.id, terms);
            }
            let terms = listing_cache.get(&record.id).and_then(|t| t.as_ref());

            offers.push(parse_offer(record.id, offer_id, &value, terms, decimals));
        }
    }

    Ok(offers)
}
