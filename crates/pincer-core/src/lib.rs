//! Core domain types for the pincer trading bot.
//!
//! Shared vocabulary for the whole workspace: precise decimal newtypes,
//! symbols and their venue rules, orders, and top-of-book quotes.

pub mod decimal;
pub mod market;
pub mod order;
pub mod quote;

// Re-export commonly used types
pub use decimal::{Price, Size};
pub use market::{RuleBook, Symbol, SymbolRules};
pub use order::{ClientOrderId, Order, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use quote::{Quote, QuoteState};
