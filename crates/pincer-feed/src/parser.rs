//! Book ticker stream parsing.
//!
//! Parses WebSocket stream events into typed [`Quote`]s.
//!
//! Supports two frame shapes:
//! 1. Routed events: stream name plus bare payload (`{"u": .., "s": ..}`)
//! 2. Combined frames: `{"stream": "btcusd@bookTicker", "data": {...}}`

use crate::error::{FeedError, FeedResult};
use pincer_core::{Price, Quote, Size, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Raw bookTicker payload.
///
/// The venue sends prices and quantities as strings.
#[derive(Debug, Deserialize)]
pub struct RawBookTicker {
    #[serde(rename = "u")]
    pub update_id: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b")]
    pub bid_price: String,
    #[serde(rename = "B")]
    pub bid_qty: String,
    #[serde(rename = "a")]
    pub ask_price: String,
    #[serde(rename = "A")]
    pub ask_qty: String,
}

/// Stream event parser.
#[derive(Debug, Default)]
pub struct TickParser;

impl TickParser {
    /// Create a new tick parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a stream event into a quote.
    ///
    /// Non-bookTicker streams are ignored and return `Ok(None)`.
    /// Malformed bookTicker payloads are an error.
    pub fn parse(&self, stream: &str, data: &Value) -> FeedResult<Option<Quote>> {
        // Combined frames can arrive still wrapped. Unwrap one level.
        if let (Some(inner_stream), Some(inner)) = (
            data.get("stream").and_then(Value::as_str),
            data.get("data"),
        ) {
            return self.parse(inner_stream, inner);
        }

        if !self.is_book_ticker(stream) {
            debug!(stream = %stream, "Ignoring non-bookTicker stream");
            return Ok(None);
        }

        let raw: RawBookTicker = serde_json::from_value(data.clone())?;

        let quote = Quote::new(
            Symbol::new(&raw.symbol),
            self.parse_price(&raw.bid_price)?,
            self.parse_size(&raw.bid_qty)?,
            self.parse_price(&raw.ask_price)?,
            self.parse_size(&raw.ask_qty)?,
        );

        let state = quote.state();
        if !state.is_tradeable() {
            warn!(
                symbol = %quote.symbol,
                state = %state,
                bid = %quote.bid_price,
                ask = %quote.ask_price,
                "Quote not tradeable"
            );
        }

        debug!(
            symbol = %quote.symbol,
            update_id = raw.update_id,
            bid = %quote.bid_price,
            ask = %quote.ask_price,
            "Book ticker update"
        );
        Ok(Some(quote))
    }

    /// Check if a stream name carries bookTicker data.
    ///
    /// Stream format: "btcusd@bookTicker". Case insensitive.
    fn is_book_ticker(&self, stream: &str) -> bool {
        match stream.rsplit_once('@') {
            Some((_, kind)) => kind.eq_ignore_ascii_case("bookticker"),
            None => false,
        }
    }

    fn parse_price(&self, s: &str) -> FeedResult<Price> {
        let d: Decimal = s
            .parse()
            .map_err(|_| FeedError::ParseError(format!("Invalid price: {s}")))?;
        Ok(Price::new(d))
    }

    fn parse_size(&self, s: &str) -> FeedResult<Size> {
        let d: Decimal = s
            .parse()
            .map_err(|_| FeedError::ParseError(format!("Invalid size: {s}")))?;
        Ok(Size::new(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pincer_core::QuoteState;
    use serde_json::json;

    fn book_ticker_payload() -> Value {
        json!({
            "u": 400900217,
            "s": "BTCUSD",
            "b": "99.90",
            "B": "5.0",
            "a": "100.00",
            "A": "3.5"
        })
    }

    #[test]
    fn test_parse_book_ticker() {
        let parser = TickParser::new();

        let result = parser
            .parse("btcusd@bookTicker", &book_ticker_payload())
            .unwrap();
        assert!(result.is_some());

        let quote = result.unwrap();
        assert_eq!(quote.symbol.as_str(), "BTCUSD");
        assert_eq!(quote.bid_price.to_string(), "99.90");
        assert_eq!(quote.bid_qty.to_string(), "5.0");
        assert_eq!(quote.ask_price.to_string(), "100.00");
        assert_eq!(quote.ask_qty.to_string(), "3.5");
        assert_eq!(quote.state(), QuoteState::Valid);
    }

    #[test]
    fn test_parse_combined_frame() {
        let parser = TickParser::new();
        let frame = json!({
            "stream": "btcusd@bookTicker",
            "data": book_ticker_payload()
        });

        let result = parser.parse("btcusd@bookTicker", &frame).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().symbol.as_str(), "BTCUSD");
    }

    #[test]
    fn test_unknown_stream_ignored() {
        let parser = TickParser::new();
        let data = json!({"e": "trade", "s": "BTCUSD", "p": "100.00"});

        let result = parser.parse("btcusd@trade", &data);
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_stream_name_case_insensitive() {
        let parser = TickParser::new();

        let result = parser
            .parse("BTCUSD@BOOKTICKER", &book_ticker_payload())
            .unwrap();
        assert!(result.is_some());
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let parser = TickParser::new();
        let data = json!({"s": "BTCUSD"});

        let result = parser.parse("btcusd@bookTicker", &data);
        assert!(matches!(result, Err(FeedError::Json(_))));
    }

    #[test]
    fn test_invalid_price_rejected() {
        let parser = TickParser::new();
        let mut data = book_ticker_payload();
        data["b"] = json!("not-a-number");

        let result = parser.parse("btcusd@bookTicker", &data);
        assert!(matches!(result, Err(FeedError::ParseError(_))));
    }

    #[test]
    fn test_crossed_quote_still_parsed() {
        let parser = TickParser::new();
        let mut data = book_ticker_payload();
        data["b"] = json!("100.10");

        // Crossed books are stored as-is; trading decisions skip them.
        let quote = parser
            .parse("btcusd@bookTicker", &data)
            .unwrap()
            .unwrap();
        assert_eq!(quote.state(), QuoteState::Crossed);
    }
}
