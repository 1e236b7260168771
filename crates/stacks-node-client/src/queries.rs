//! Typed read-only call helpers
//!
//! Thin layer over [`NodeClient::call_read_only`] that decodes the hex result.

use clarity_codec::{decode_hex, ClarityValue};
use lendscope_core::{ContractId, NodeError};

use crate::{NodeClient, Result};

/// Call a read-only function and decode the result.
///
/// `None` means the node answered with the absent sentinel.
pub async fn read_value(
    node: &NodeClient,
    contract: &ContractId,
    function: &str,
    sender: &str,
    arguments: &[String],
) -> Result<Option<ClarityValue>> {
    let Some(hex) = node
        .call_read_only(contract, function, sender, arguments)
        .await?
    else {
        return Ok(None);
    };

    let value = decode_hex(&hex).map_err(|e| {
        NodeError::ParseError(format!("{}::{} returned {}: {}", contract.name, function, hex, e))
    })?;

    if value.is_none() {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Read a `uint` (optionally wrapped in `ok`/`some`), treating absent as `None`
pub async fn read_uint(
    node: &NodeClient,
    contract: &ContractId,
    function: &str,
    sender: &str,
    arguments: &[String],
) -> Result<Option<u128>> {
    let value = read_value(node, contract, function, sender, arguments).await?;
    match value {
        None => Ok(None),
        Some(v) => expect_uint(&v).map(Some).ok_or_else(|| {
            NodeError::ParseError(format!(
                "{}::{} returned {}, expected uint",
                contract.name,
                function,
                v.type_name()
            ))
        }),
    }
}

/// Read a `bool` (optionally wrapped in `ok`/`some`)
pub async fn read_bool(
    node: &NodeClient,
    contract: &ContractId,
    function: &str,
    sender: &str,
    arguments: &[String],
) -> Result<bool> {
    let value = read_value(node, contract, function, sender, arguments).await?;
    match value.as_ref().and_then(expect_bool) {
        Some(b) => Ok(b),
        None => Err(NodeError::ParseError(format!(
            "{}::{} did not return a bool",
            contract.name, function
        ))),
    }
}

fn expect_uint(value: &ClarityValue) -> Option<u128> {
    value.unwrap_some_ok().as_uint()
}

fn expect_bool(value: &ClarityValue) -> Option<bool> {
    value.unwrap_some_ok().as_bool()
}
