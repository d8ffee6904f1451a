//! Market data intake for pincer.
//!
//! Parses bookTicker stream events into typed quotes and keeps the
//! latest quote per symbol in a concurrent cache.

pub mod error;
pub mod parser;
pub mod quote_cache;

pub use error::{FeedError, FeedResult};
pub use parser::{RawBookTicker, TickParser};
pub use quote_cache::QuoteCache;
