//! Decoding of the remote orders payload into domain orders.
//!
//! The wire format carries every field as a JSON string:
//!
//! ```json
//! { "orders": [ { "amount": "748.279727546401", "currency": "BTC",
//!   "createdAt": "1595770212105", "orderId": "3a16…",
//!   "orderStatus": "approved", "orderType": "deposit" } ] }
//! ```
//!
//! Decoding is all-or-nothing: a single invalid record fails the batch.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Order, OrderStatus, OrderType};

/// Decoding errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON or does not have the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A field is present but its value cannot be coerced.
    #[error("invalid value at {path}: {reason}")]
    InvalidField { path: String, reason: String },
}

impl DecodeError {
    fn invalid(index: usize, field: &str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidField {
            path: format!("orders[{}].{}", index, field),
            reason: reason.into(),
        }
    }

    /// Returns the path of the offending field, if known.
    pub fn field_path(&self) -> Option<&str> {
        match self {
            DecodeError::InvalidField { path, .. } => Some(path),
            DecodeError::Malformed(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrdersEnvelope {
    orders: Vec<OrderWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderWire {
    amount: String,
    currency: String,
    created_at: String,
    order_id: String,
    order_status: String,
    order_type: String,
}

/// Decodes a serialized `{ "orders": [...] }` payload, preserving record order.
pub fn decode(payload: &[u8]) -> Result<Vec<Order>, DecodeError> {
    let envelope: OrdersEnvelope = serde_json::from_slice(payload)?;

    envelope
        .orders
        .into_iter()
        .enumerate()
        .map(|(index, wire)| decode_order(index, wire))
        .collect()
}

fn decode_order(index: usize, wire: OrderWire) -> Result<Order, DecodeError> {
    let amount = parse_amount(&wire.amount)
        .ok_or_else(|| DecodeError::invalid(index, "amount", format!("not a decimal: {:?}", wire.amount)))?;

    let created_at = parse_created_at(&wire.created_at).ok_or_else(|| {
        DecodeError::invalid(
            index,
            "createdAt",
            format!("not a millisecond timestamp: {:?}", wire.created_at),
        )
    })?;

    let status = parse_status(&wire.order_status).ok_or_else(|| {
        DecodeError::invalid(index, "orderStatus", format!("unknown status: {:?}", wire.order_status))
    })?;

    let order_type = OrderType::from_str(&wire.order_type)
        .map_err(|e| DecodeError::invalid(index, "orderType", e))?;

    Ok(Order {
        order_id: wire.order_id,
        amount,
        currency: wire.currency,
        created_at,
        status,
        order_type,
    })
}

/// Parses a decimal amount without rounding.
fn parse_amount(raw: &str) -> Option<Decimal> {
    if raw.contains(['e', 'E']) {
        return Decimal::from_scientific(raw).ok();
    }
    Decimal::from_str_exact(raw).ok()
}

/// Parses a millisecond epoch string, truncating to whole seconds.
fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = raw.parse().ok()?;
    DateTime::from_timestamp(millis / 1000, 0)
}

fn parse_status(raw: &str) -> Option<OrderStatus> {
    match raw {
        "approved" => Some(OrderStatus::Approved),
        "canceled" => Some(OrderStatus::Cancelled),
        "executed" => Some(OrderStatus::Executed),
        "processing" => Some(OrderStatus::Processing),
        _ => None,
    }
}
