//! In-process mock of the node's read-only API
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clarity_codec::{ClarityValue, Principal};
use lendscope_core::AppConfig;
use serde::Deserialize;
use serde_json::json;
use stacks_node_client::{NodeClient, RetryPolicy};

pub const BORROWER_HASH: [u8; 20] = [0x11; 20];
pub const BIDDER_HASH: [u8; 20] = [0x22; 20];

#[derive(Debug, Clone)]
pub enum Reply {
    Hex(String),
    Status(u16),
}

#[derive(Default)]
pub struct MockNode {
    pub burn_height: u64,
    pub initialized: bool,
    pub loan_count: u64,
    pub loans: HashMap<u64, Reply>,
    pub bids: HashMap<u64, String>,
    pub bid_counts: HashMap<u64, u128>,
    /// (function, loan id) -> ownership answer
    pub owners: HashMap<(String, u64), Reply>,
    /// loan id -> `get-listing` answer; unlisted loans answer `none`
    pub listings: HashMap<u64, Reply>,
    /// loan id -> `get-offer-nonce` answer; missing means zero offers
    pub offer_counts: HashMap<u64, Reply>,
    /// (loan id, offer id) -> `get-offer` answer; missing means `none`
    pub offers: HashMap<(u64, u64), Reply>,
    /// loan id -> number of 429 replies to `get-loan` before answering
    pub rate_limits: Mutex<HashMap<u64, u32>>,
    pub calls: Mutex<HashMap<String, u32>>,
}

impl MockNode {
    pub fn new(loan_count: u64) -> Self {
        Self {
            burn_height: 1_000,
            initialized: true,
            loan_count,
            ..Default::default()
        }
    }

    pub fn calls(&self, function: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(function)
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Deserialize)]
struct CallBody {
    #[allow(dead_code)]
    sender: String,
    arguments: Vec<String>,
}

fn parse_uint_arg(arg: &str) -> Option<u64> {
    let digits = arg.strip_prefix("0x01")?;
    u64::try_from(u128::from_str_radix(digits, 16).ok()?).ok()
}

fn ok_result(hex: &str) -> Response {
    Json(json!({ "okay": true, "result": hex })).into_response()
}

fn reply(r: &Reply) -> Response {
    match r {
        Reply::Hex(h) => ok_result(h),
        Reply::Status(s) => (
            StatusCode::from_u16(*s).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "mock failure",
        )
            .into_response(),
    }
}

async fn info(State(node): State<Arc<MockNode>>) -> Response {
    *node.calls.lock().unwrap().entry("info".into()).or_insert(0) += 1;
    Json(json!({
        "burn_block_height": node.burn_height,
        "stacks_tip_height": node.burn_height * 10,
        "server_version": "mock",
        "network_id": 2147483648u32,
    }))
    .into_response()
}

async fn call_read(
    State(node): State<Arc<MockNode>>,
    Path((_deployer, _contract, function)): Path<(String, String, String)>,
    Json(body): Json<CallBody>,
) -> Response {
    *node.calls.lock().unwrap().entry(function.clone()).or_insert(0) += 1;
    let id = body.arguments.first().and_then(|a| parse_uint_arg(a)).unwrap_or(0);
    let second = body.arguments.get(1).and_then(|a| parse_uint_arg(a)).unwrap_or(0);

    match function.as_str() {
        "is-initialized" => ok_result(if node.initialized { "0x03" } else { "0x04" }),
        "get-loan-nonce" => {
            ok_result(&ClarityValue::UInt(node.loan_count as u128).to_hex().unwrap())
        }
        "get-loan" => {
            {
                let mut limits = node.rate_limits.lock().unwrap();
                if let Some(remaining) = limits.get_mut(&id) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
                    }
                }
            }
            match node.loans.get(&id) {
                Some(r) => reply(r),
                None => ok_result("0x09"),
            }
        }
        "get-current-bid" => ok_result(node.bids.get(&id).map(String::as_str).unwrap_or("0x09")),
        "get-bid-count" => {
            let count = node.bid_counts.get(&id).copied().unwrap_or(0);
            let value = ClarityValue::ResponseOk(Box::new(ClarityValue::UInt(count)));
            ok_result(&value.to_hex().unwrap())
        }
        "is-borrower-owner" | "is-lender-owner" => match node.owners.get(&(function.clone(), id)) {
            Some(r) => reply(r),
            None => ok_result("0x04"),
        },
        "get-listing" => match node.listings.get(&id) {
            Some(r) => reply(r),
            None => ok_result("0x09"),
        },
        "get-offer-nonce" => match node.offer_counts.get(&id) {
            Some(r) => reply(r),
            None => ok_result(&ClarityValue::UInt(0).to_hex().unwrap()),
        },
        "get-offer" => match node.offers.get(&(id, second)) {
            Some(r) => reply(r),
            None => ok_result("0x09"),
        },
        _ => (StatusCode::BAD_REQUEST, "unknown function").into_response(),
    }
}

/// Start the mock on an ephemeral port and return its base URL
pub async fn spawn(node: MockNode) -> (String, Arc<MockNode>) {
    let node = Arc::new(node);
    let app = Router::new()
        .route("/v2/info", get(info))
        .route(
            "/v2/contracts/call-read/:deployer/:contract/:function",
            post(call_read),
        )
        .with_state(node.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), node)
}

/// Config pointed at the mock with short retry delays
pub fn config_for(url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.node.url = url.to_string();
    config.node.timeout_secs = 5;
    config.fetch.rate_limit_base_delay_ms = 10;
    config.fetch.transient_delay_ms = 10;
    config.fetch.position_check_delay_ms = 0;
    config
}

pub fn client_for(config: &AppConfig) -> NodeClient {
    NodeClient::new(config.node.clone(), RetryPolicy::from(&config.fetch)).unwrap()
}

fn principal(hash: [u8; 20]) -> ClarityValue {
    ClarityValue::Principal(Principal::standard(26, hash))
}

/// `(some { .. })` loan tuple as returned by `get-loan`
pub fn loan_hex(status: &str, collateral: u128, borrow: u128, auction_end: u128) -> String {
    ClarityValue::OptionalSome(Box::new(ClarityValue::Tuple(vec![
        ("auction-end-block".into(), ClarityValue::UInt(auction_end)),
        ("borrow-amount".into(), ClarityValue::UInt(borrow)),
        ("borrower".into(), principal(BORROWER_HASH)),
        ("collateral-amount".into(), ClarityValue::UInt(collateral)),
        ("lender".into(), ClarityValue::OptionalNone),
        ("maturity-block".into(), ClarityValue::UInt(auction_end + 4_320)),
        ("max-repayment".into(), ClarityValue::UInt(borrow + borrow / 10)),
        ("repayment-amount".into(), ClarityValue::UInt(0)),
        ("status".into(), ClarityValue::StringAscii(status.into())),
    ])))
    .to_hex()
    .unwrap()
}

/// `(some { amount, bidder })` as returned by `get-current-bid`
pub fn bid_hex(amount: u128) -> String {
    ClarityValue::OptionalSome(Box::new(ClarityValue::Tuple(vec![
        ("amount".into(), ClarityValue::UInt(amount)),
        ("bidder".into(), principal(BIDDER_HASH)),
    ])))
    .to_hex()
    .unwrap()
}

/// `uint` reply, as returned by the nonce functions
pub fn uint_hex(value: u128) -> String {
    ClarityValue::UInt(value).to_hex().unwrap()
}

/// `(some { seller, position-type, asking-price })` as returned by `get-listing`
pub fn listing_hex(position_type: &str, asking_price: Option<u128>) -> String {
    let asking = match asking_price {
        Some(p) => ClarityValue::OptionalSome(Box::new(ClarityValue::UInt(p))),
        None => ClarityValue::OptionalNone,
    };
    ClarityValue::OptionalSome(Box::new(ClarityValue::Tuple(vec![
        ("asking-price".into(), asking),
        ("position-type".into(), ClarityValue::StringAscii(position_type.into())),
        ("seller".into(), principal(BORROWER_HASH)),
    ])))
    .to_hex()
    .unwrap()
}

/// `(some { buyer, amount, status, counter-amount })` as returned by `get-offer`
pub fn offer_hex(buyer: [u8; 20], amount: u128) -> String {
    ClarityValue::OptionalSome(Box::new(ClarityValue::Tuple(vec![
        ("amount".into(), ClarityValue::UInt(amount)),
        ("buyer".into(), principal(buyer)),
        ("counter-amount".into(), ClarityValue::OptionalNone),
        ("status".into(), ClarityValue::StringAscii("pending".into())),
    ])))
    .to_hex()
    .unwrap()
}
