//! Top-of-book quotes and their validity.

use crate::{Price, Size, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validity of a top-of-book quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteState {
    /// Both sides present, bid below ask.
    Valid,
    /// Bid side missing or zero.
    NoBid,
    /// Ask side missing or zero.
    NoAsk,
    /// Both sides missing.
    Empty,
    /// Bid at or above ask.
    Crossed,
}

impl QuoteState {
    /// Check if this state allows trading decisions.
    #[must_use]
    pub fn is_tradeable(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl std::fmt::Display for QuoteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "VALID"),
            Self::NoBid => write!(f, "NO_BID"),
            Self::NoAsk => write!(f, "NO_ASK"),
            Self::Empty => write!(f, "EMPTY"),
            Self::Crossed => write!(f, "CROSSED"),
        }
    }
}

/// Best bid and ask for one symbol at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    /// Best bid price.
    pub bid_price: Price,
    /// Quantity displayed at the best bid.
    pub bid_qty: Size,
    /// Best ask price.
    pub ask_price: Price,
    /// Quantity displayed at the best ask.
    pub ask_qty: Size,
    /// When this quote was received.
    pub received_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(
        symbol: Symbol,
        bid_price: Price,
        bid_qty: Size,
        ask_price: Price,
        ask_qty: Size,
    ) -> Self {
        Self {
            symbol,
            bid_price,
            bid_qty,
            ask_price,
            ask_qty,
            received_at: Utc::now(),
        }
    }

    /// Classify this quote for trading decisions.
    pub fn state(&self) -> QuoteState {
        let has_bid = self.bid_price.is_positive() && self.bid_qty.is_positive();
        let has_ask = self.ask_price.is_positive() && self.ask_qty.is_positive();

        match (has_bid, has_ask) {
            (false, false) => QuoteState::Empty,
            (true, false) => QuoteState::NoAsk,
            (false, true) => QuoteState::NoBid,
            (true, true) => {
                if self.bid_price < self.ask_price {
                    QuoteState::Valid
                } else {
                    QuoteState::Crossed
                }
            }
        }
    }

    /// Equivalent to `self.state() == QuoteState::Valid`.
    pub fn is_valid(&self) -> bool {
        self.state() == QuoteState::Valid
    }

    /// Ask minus bid.
    pub fn spread(&self) -> Price {
        self.ask_price - self.bid_price
    }

    /// Age of this quote in milliseconds.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.received_at).num_milliseconds()
    }
}
