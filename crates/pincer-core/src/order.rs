//! Order-related types and identifiers.
//!
//! Order side, type, time-in-force, venue status, and the tracked
//! order record shared by the execution path.

use crate::{Price, Size, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Wire value expected by the venue.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Resting limit order.
    Limit,
    /// Immediate execution at whatever the book offers.
    Market,
}

impl OrderType {
    /// Wire value expected by the venue.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "LIMIT",
            Self::Market => "MARKET",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time-in-force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-canceled. The resting-order default here.
    #[default]
    #[serde(rename = "GTC")]
    GoodTilCanceled,
    /// Immediate-or-cancel.
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    /// Fill-or-kill.
    #[serde(rename = "FOK")]
    FillOrKill,
}

impl TimeInForce {
    /// Wire value expected by the venue.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoodTilCanceled => "GTC",
            Self::ImmediateOrCancel => "IOC",
            Self::FillOrKill => "FOK",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order status as reported by the venue.
///
/// Statuses outside the known set deserialize to `Unknown` rather
/// than failing the whole response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Expired,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Returns true once the venue will never change this order again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Expired | Self::Rejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Canceled => "CANCELED",
            Self::Expired => "EXPIRED",
            Self::Rejected => "REJECTED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client order ID for idempotency.
///
/// Every order submitted carries a unique id so a retried request can
/// never double-place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `pincer_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("pincer_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (for parsing responses).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A venue order as this system last saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Venue-assigned order id.
    pub order_id: u64,
    /// Client-assigned id submitted with the order.
    pub client_order_id: ClientOrderId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Limit price. Market orders carry none.
    pub price: Option<Price>,
    /// Requested quantity.
    pub quantity: Size,
    /// Quantity executed so far.
    pub executed_qty: Size,
    pub status: OrderStatus,
}

impl Order {
    /// Unfilled remainder of the requested quantity.
    #[must_use]
    pub fn remaining(&self) -> Size {
        self.quantity - self.executed_qty
    }

    /// Executed fraction of the requested quantity, zero when nothing
    /// was requested.
    #[must_use]
    pub fn fill_ratio(&self) -> Decimal {
        if self.quantity.is_zero() {
            return Decimal::ZERO;
        }
        self.executed_qty.inner() / self.quantity.inner()
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order(quantity: Size, executed: Size, status: OrderStatus) -> Order {
        Order {
            order_id: 42,
            client_order_id: ClientOrderId::new(),
            symbol: Symbol::from("BTCUSD"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            price: Some(Price::new(dec!(100.00))),
            quantity,
            executed_qty: executed,
            status,
        }
    }

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(OrderSide::Buy.as_str(), "BUY");
        assert_eq!(OrderSide::Sell.as_str(), "SELL");
        assert_eq!(OrderType::Limit.as_str(), "LIMIT");
        assert_eq!(OrderType::Market.as_str(), "MARKET");
        assert_eq!(TimeInForce::GoodTilCanceled.as_str(), "GTC");
        assert_eq!(TimeInForce::default(), TimeInForce::GoodTilCanceled);
    }

    #[test]
    fn test_status_terminal_table() {
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
        assert!(!OrderStatus::Unknown.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_status_deserialize_wire_names() {
        let s: OrderStatus = serde_json::from_str("\"PARTIALLY_FILLED\"").unwrap();
        assert_eq!(s, OrderStatus::PartiallyFilled);

        let s: OrderStatus = serde_json::from_str("\"CANCELED\"").unwrap();
        assert_eq!(s, OrderStatus::Canceled);
    }

    #[test]
    fn test_status_unknown_catchall() {
        let s: OrderStatus = serde_json::from_str("\"PENDING_CANCEL\"").unwrap();
        assert_eq!(s, OrderStatus::Unknown);
    }

    #[test]
    fn test_client_order_id_unique() {
        let id1 = ClientOrderId::new();
        let id2 = ClientOrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_client_order_id_format() {
        let id = ClientOrderId::new();
        assert!(id.as_str().starts_with("pincer_"));
    }

    #[test]
    fn test_order_remaining_and_ratio() {
        let order = sample_order(
            Size::new(dec!(0.5)),
            Size::new(dec!(0.3)),
            OrderStatus::PartiallyFilled,
        );

        assert_eq!(order.remaining(), Size::new(dec!(0.2)));
        assert_eq!(order.fill_ratio(), dec!(0.6));
        assert!(!order.is_filled());
    }

    #[test]
    fn test_fill_ratio_zero_quantity() {
        let order = sample_order(Size::ZERO, Size::ZERO, OrderStatus::New);
        assert_eq!(order.fill_ratio(), Decimal::ZERO);
    }
}
