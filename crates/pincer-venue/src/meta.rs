//! Exchange metadata client.
//!
//! Fetches per-symbol trading filters from the public exchange-info
//! endpoint and folds them into [`SymbolRules`] for preflight
//! validation and order rounding.

use crate::error::{classify_response, classify_transport, VenueError, VenueResult};
use pincer_core::{Price, RuleBook, Size, Symbol, SymbolRules};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Exchange info endpoint path.
const EXCHANGE_INFO_PATH: &str = "/api/v3/exchangeInfo";

/// Symbol status under which orders are accepted.
const STATUS_TRADING: &str = "TRADING";

/// Raw exchange info response.
#[derive(Debug, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<SymbolInfo>,
}

/// Per-symbol entry from exchange info.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    filters: Vec<SymbolFilter>,
}

/// Known symbol filters. Unrecognized filter types map to `Other`.
#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price { tick_size: String },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize { step_size: String, min_qty: String },
    #[serde(rename = "NOTIONAL", rename_all = "camelCase")]
    Notional { min_notional: String },
    // Older deployments publish the notional floor under this name.
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional { min_notional: String },
    #[serde(other)]
    Other,
}

/// Client for fetching exchange metadata.
pub struct MetaClient {
    client: Client,
    base_url: String,
}

impl MetaClient {
    pub fn new(base_url: impl Into<String>) -> VenueResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| VenueError::Fatal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch trading rules for the given symbols.
    ///
    /// Any symbol that is missing, not trading, or published without
    /// its price and lot filters fails the whole fetch.
    pub async fn fetch_symbol_rules(&self, symbols: &[Symbol]) -> VenueResult<RuleBook> {
        info!(
            url = %self.base_url,
            symbol_count = symbols.len(),
            "Fetching exchange filters"
        );

        let mut book = RuleBook::new();
        for symbol in symbols {
            let info = self.fetch_symbol_info(symbol).await?;
            let rules = validate_symbol_info(&info)?;

            debug!(
                symbol = %symbol,
                tick_size = %rules.tick_size,
                step_size = %rules.step_size,
                min_notional = %rules.min_notional,
                "Symbol rules"
            );
            book.insert(symbol.clone(), rules);
        }

        info!(symbol_count = book.len(), "Fetched exchange filters");
        Ok(book)
    }

    async fn fetch_symbol_info(&self, symbol: &Symbol) -> VenueResult<SymbolInfo> {
        let url = format!(
            "{}{EXCHANGE_INFO_PATH}?symbol={}",
            self.base_url,
            symbol.as_str()
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;
        if !status.is_success() {
            return Err(classify_response(status, None, &body));
        }

        let parsed: ExchangeInfoResponse = serde_json::from_str(&body).map_err(|e| {
            VenueError::Transient(format!("Failed to parse exchange info: {e}"))
        })?;

        parsed
            .symbols
            .into_iter()
            .find(|info| info.symbol == symbol.as_str())
            .ok_or_else(|| {
                VenueError::Fatal(format!("Symbol {} not listed on venue", symbol))
            })
    }
}

/// Check a symbol is tradeable and fold its filters into rules.
fn validate_symbol_info(info: &SymbolInfo) -> VenueResult<SymbolRules> {
    if info.status != STATUS_TRADING {
        return Err(VenueError::Fatal(format!(
            "Symbol {} is not trading (status {})",
            info.symbol, info.status
        )));
    }

    let mut tick_size = None;
    let mut step_size = None;
    let mut min_qty = None;
    let mut min_notional = Decimal::ZERO;

    for filter in &info.filters {
        match filter {
            SymbolFilter::Price { tick_size: raw } => {
                tick_size = Some(parse_filter_decimal(&info.symbol, "tickSize", raw)?);
            }
            SymbolFilter::LotSize {
                step_size: raw_step,
                min_qty: raw_min,
            } => {
                step_size = Some(parse_filter_decimal(&info.symbol, "stepSize", raw_step)?);
                min_qty = Some(parse_filter_decimal(&info.symbol, "minQty", raw_min)?);
            }
            SymbolFilter::Notional { min_notional: raw }
            | SymbolFilter::MinNotional { min_notional: raw } => {
                min_notional = parse_filter_decimal(&info.symbol, "minNotional", raw)?;
            }
            SymbolFilter::Other => {}
        }
    }

    let tick_size = tick_size.ok_or_else(|| {
        VenueError::Fatal(format!("Symbol {} missing PRICE_FILTER", info.symbol))
    })?;
    let (step_size, min_qty) = match (step_size, min_qty) {
        (Some(step), Some(min)) => (step, min),
        _ => {
            return Err(VenueError::Fatal(format!(
                "Symbol {} missing LOT_SIZE filter",
                info.symbol
            )))
        }
    };

    Ok(SymbolRules {
        tick_size: Price::new(tick_size),
        step_size: Size::new(step_size),
        min_qty: Size::new(min_qty),
        min_notional,
    })
}

fn parse_filter_decimal(symbol: &str, field: &str, raw: &str) -> VenueResult<Decimal> {
    raw.parse().map_err(|_| {
        VenueError::Fatal(format!("Symbol {symbol}: invalid {field} in filters: {raw}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn symbol_info(status: &str, filters: serde_json::Value) -> SymbolInfo {
        serde_json::from_value(serde_json::json!({
            "symbol": "BTCUSD",
            "status": status,
            "filters": filters
        }))
        .unwrap()
    }

    #[test]
    fn test_filters_fold_into_rules() {
        let info = symbol_info(
            "TRADING",
            serde_json::json!([
                {"filterType": "PRICE_FILTER", "minPrice": "0.01", "maxPrice": "100000.00", "tickSize": "0.01"},
                {"filterType": "LOT_SIZE", "minQty": "0.00100000", "maxQty": "9000.00", "stepSize": "0.00100000"},
                {"filterType": "NOTIONAL", "minNotional": "10.00", "applyMinToMarket": true},
                {"filterType": "MAX_NUM_ORDERS", "maxNumOrders": 200}
            ]),
        );

        let rules = validate_symbol_info(&info).unwrap();
        assert_eq!(rules.tick_size, Price::new(dec!(0.01)));
        assert_eq!(rules.step_size, Size::new(dec!(0.00100000)));
        assert_eq!(rules.min_qty, Size::new(dec!(0.00100000)));
        assert_eq!(rules.min_notional, dec!(10.00));
    }

    #[test]
    fn test_legacy_min_notional_filter() {
        let info = symbol_info(
            "TRADING",
            serde_json::json!([
                {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                {"filterType": "LOT_SIZE", "minQty": "0.001", "stepSize": "0.001"},
                {"filterType": "MIN_NOTIONAL", "minNotional": "5.00"}
            ]),
        );

        let rules = validate_symbol_info(&info).unwrap();
        assert_eq!(rules.min_notional, dec!(5.00));
    }

    #[test]
    fn test_missing_notional_defaults_to_zero() {
        let info = symbol_info(
            "TRADING",
            serde_json::json!([
                {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                {"filterType": "LOT_SIZE", "minQty": "0.001", "stepSize": "0.001"}
            ]),
        );

        let rules = validate_symbol_info(&info).unwrap();
        assert_eq!(rules.min_notional, Decimal::ZERO);
    }

    #[test]
    fn test_halted_symbol_rejected() {
        let info = symbol_info(
            "BREAK",
            serde_json::json!([
                {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                {"filterType": "LOT_SIZE", "minQty": "0.001", "stepSize": "0.001"}
            ]),
        );

        assert!(matches!(
            validate_symbol_info(&info),
            Err(VenueError::Fatal(_))
        ));
    }

    #[test]
    fn test_missing_lot_size_rejected() {
        let info = symbol_info(
            "TRADING",
            serde_json::json!([
                {"filterType": "PRICE_FILTER", "tickSize": "0.01"}
            ]),
        );

        assert!(matches!(
            validate_symbol_info(&info),
            Err(VenueError::Fatal(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_drop_mid_body_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Serve a response that promises 1000 body bytes but closes
        // after a few.
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 1000\r\n\r\npartial")
                .await
                .unwrap();
            stream.shutdown().await.unwrap();
        });

        let client = MetaClient::new(format!("http://{addr}")).unwrap();
        let err = client
            .fetch_symbol_rules(&[Symbol::from("BTCUSD")])
            .await
            .unwrap_err();

        assert!(
            matches!(err, VenueError::Transient(_)),
            "expected Transient, got {err:?}"
        );
        server.await.unwrap();
    }
}
