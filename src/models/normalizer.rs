use crate::error::ProcessingError;
use crate::models::{Direction, RawTransaction, TransactionRecord};

const WEI_PER_ETHER: f64 = 1e18;
const WEI_PER_GWEI: f64 = 1e9;

/// Map one raw chain transaction onto the uniform row schema.
///
/// Pure function: the queried address decides the direction, the block
/// timestamp supplies the row time. Any missing required field yields a
/// MalformedRecord naming it, so the caller can skip the record and move on.
pub fn normalize_transaction(
    raw: &RawTransaction,
    chain: &str,
    queried_address: &str,
    block_timestamp: u64,
) -> Result<TransactionRecord, ProcessingError> {
    let hash = require_field(&raw.hash, "hash", raw)?;
    let from = require_field(&raw.from, "from", raw)?;
    let value_hex = require_field(&raw.value, "value", raw)?;
    let gas_price_hex = require_field(&raw.gas_price, "gasPrice", raw)?;
    let block_number_hex = require_field(&raw.block_number, "blockNumber", raw)?;
    let nonce_hex = require_field(&raw.nonce, "nonce", raw)?;

    let value = parse_hex_u128(value_hex)? as f64 / WEI_PER_ETHER;
    let gas_price_gwei = parse_hex_u128(gas_price_hex)? as f64 / WEI_PER_GWEI;
    let block_number = parse_hex_u64(block_number_hex)?;
    let nonce = parse_hex_u64(nonce_hex)?;

    let direction = if from.eq_ignore_ascii_case(queried_address) {
        Direction::Outgoing
    } else {
        Direction::Incoming
    };

    Ok(TransactionRecord {
        chain: chain.to_string(),
        hash: hash.to_string(),
        from_address: from.to_string(),
        // Contract creation carries no recipient
        to_address: raw.to.clone().unwrap_or_default(),
        value,
        gas_price_gwei,
        block_number,
        nonce,
        timestamp: block_timestamp,
        direction,
    })
}

fn require_field<'a>(
    field: &'a Option<String>,
    name: &str,
    raw: &RawTransaction,
) -> Result<&'a str, ProcessingError> {
    field
        .as_deref()
        .ok_or_else(|| ProcessingError::MalformedRecord {
            field: name.to_string(),
            hash: raw.hash.clone().unwrap_or_else(|| "<unknown>".to_string()),
        })
}

fn parse_hex_u128(hex_str: &str) -> Result<u128, ProcessingError> {
    let hex_without_prefix = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u128::from_str_radix(hex_without_prefix, 16)
        .map_err(|e| ProcessingError::AmountParsing(format!("'{}': {}", hex_str, e)))
}

fn parse_hex_u64(hex_str: &str) -> Result<u64, ProcessingError> {
    let hex_without_prefix = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u64::from_str_radix(hex_without_prefix, 16)
        .map_err(|e| ProcessingError::AmountParsing(format!("'{}': {}", hex_str, e)))
}
