//! Cached order entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OrderStatus represents the lifecycle state reported by the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order was approved.
    Approved,
    /// The order was cancelled. The wire format spells it "canceled".
    Cancelled,
    /// The order was executed.
    Executed,
    /// The order is still being processed.
    Processing,
}

impl OrderStatus {
    /// Returns the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Approved => "approved",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Executed => "executed",
            OrderStatus::Processing => "processing",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(OrderStatus::Approved),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "executed" => Ok(OrderStatus::Executed),
            "processing" => Ok(OrderStatus::Processing),
            _ => Err(format!("unknown order status: {}", s)),
        }
    }
}

/// OrderType represents the kind of transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Buy,
    Sell,
    Deposit,
    Withdraw,
}

impl OrderType {
    /// Returns the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Buy => "buy",
            OrderType::Sell => "sell",
            OrderType::Deposit => "deposit",
            OrderType::Withdraw => "withdraw",
        }
    }

    /// Buys and deposits credit the account, sells and withdrawals debit it.
    pub fn is_credit(&self) -> bool {
        matches!(self, OrderType::Buy | OrderType::Deposit)
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(OrderType::Buy),
            "sell" => Ok(OrderType::Sell),
            "deposit" => Ok(OrderType::Deposit),
            "withdraw" => Ok(OrderType::Withdraw),
            _ => Err(format!("unknown order type: {}", s)),
        }
    }
}

/// Order is a single financial transaction record cached from the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Globally unique identifier, used as the primary key.
    pub order_id: String,
    /// Transaction amount, unsigned.
    pub amount: Decimal,
    /// Currency code (e.g., "BTC").
    pub currency: String,
    /// Creation time truncated to whole seconds.
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    #[serde(rename = "type")]
    pub order_type: OrderType,
}

impl Order {
    /// Returns the amount signed by direction: positive for credits, negative for debits.
    pub fn signed_amount(&self) -> Decimal {
        if self.order_type.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn order(order_type: OrderType) -> Order {
        Order {
            order_id: "abc".to_string(),
            amount: Decimal::from_str("12.50").unwrap(),
            currency: "ETH".to_string(),
            created_at: DateTime::from_timestamp(1_600_000_000, 0).unwrap(),
            status: OrderStatus::Executed,
            order_type,
        }
    }

    #[test]
    fn test_status_round_trips_through_persisted_form() {
        for status in [
            OrderStatus::Approved,
            OrderStatus::Cancelled,
            OrderStatus::Executed,
            OrderStatus::Processing,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_status_rejects_wire_spelling() {
        // "canceled" is only accepted by the wire codec
        assert!(OrderStatus::from_str("canceled").is_err());
    }

    #[test]
    fn test_type_rejects_unknown() {
        let err = OrderType::from_str("transfer").unwrap_err();
        assert!(err.contains("unknown order type"));
    }

    #[test]
    fn test_signed_amount_credit() {
        assert_eq!(order(OrderType::Buy).signed_amount(), Decimal::from_str("12.50").unwrap());
        assert_eq!(order(OrderType::Deposit).signed_amount(), Decimal::from_str("12.50").unwrap());
    }

    #[test]
    fn test_signed_amount_debit() {
        assert_eq!(order(OrderType::Sell).signed_amount(), Decimal::from_str("-12.50").unwrap());
        assert_eq!(order(OrderType::Withdraw).signed_amount(), Decimal::from_str("-12.50").unwrap());
    }
}
