//! Request signing.
//!
//! Signed endpoints require an HMAC-SHA256 signature over the exact
//! query string sent, so parameter order must be stable from build to
//! sign to send. [`QueryString`] preserves insertion order.

use crate::error::{VenueError, VenueResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::Display;

type HmacSha256 = Hmac<Sha256>;

/// Insertion-ordered query-string builder.
///
/// Values are rendered with `Display`. The venue's parameter alphabet
/// is URL-safe, so no percent-encoding is applied.
#[derive(Debug, Clone, Default)]
pub struct QueryString {
    params: Vec<(String, String)>,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    #[must_use]
    pub fn push(mut self, key: &str, value: impl Display) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a parameter if the value is present.
    #[must_use]
    pub fn push_opt(self, key: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(v) => self.push(key, v),
            None => self,
        }
    }

    /// Render as `key=value&key=value` in insertion order.
    pub fn encode(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// HMAC-SHA256 signature of a query string, hex encoded.
pub fn sign_query(query: &str, secret: &str) -> VenueResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| VenueError::Fatal(format!("Invalid API secret: {e}")))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Render, sign, and append the signature parameter.
pub fn signed_query(params: &QueryString, secret: &str) -> VenueResult<String> {
    let query = params.encode();
    let signature = sign_query(&query, secret)?;
    Ok(format!("{query}&signature={signature}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Published venue documentation example for SIGNED endpoints.
    const DOC_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
    const DOC_QUERY: &str = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
    const DOC_SIGNATURE: &str = "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71";

    #[test]
    fn test_sign_query_documented_vector() {
        let sig = sign_query(DOC_QUERY, DOC_SECRET).unwrap();
        assert_eq!(sig, DOC_SIGNATURE);
    }

    #[test]
    fn test_query_string_preserves_insertion_order() {
        let query = QueryString::new()
            .push("symbol", "LTCBTC")
            .push("side", "BUY")
            .push("type", "LIMIT")
            .push("timeInForce", "GTC")
            .push("quantity", 1)
            .push("price", "0.1")
            .push("recvWindow", 5000)
            .push("timestamp", 1499827319559u64);

        assert_eq!(query.encode(), DOC_QUERY);
    }

    #[test]
    fn test_signed_query_appends_signature() {
        let query = QueryString::new()
            .push("symbol", "LTCBTC")
            .push("side", "BUY")
            .push("type", "LIMIT")
            .push("timeInForce", "GTC")
            .push("quantity", 1)
            .push("price", "0.1")
            .push("recvWindow", 5000)
            .push("timestamp", 1499827319559u64);

        let full = signed_query(&query, DOC_SECRET).unwrap();
        assert_eq!(full, format!("{DOC_QUERY}&signature={DOC_SIGNATURE}"));
    }

    #[test]
    fn test_push_opt_skips_none() {
        let query = QueryString::new()
            .push("a", 1)
            .push_opt("b", None::<u64>)
            .push_opt("c", Some(3));

        assert_eq!(query.encode(), "a=1&c=3");
    }

    #[test]
    fn test_empty_query() {
        let query = QueryString::new();
        assert!(query.is_empty());
        assert_eq!(query.encode(), "");
    }
}
