//! Signed REST client for the order endpoints.
//!
//! Place, cancel, and query run against `/api/v3/order` with an
//! HMAC-signed query string and the API key header. Responses map
//! into the shared [`Order`] record; failures map through
//! [`classify_response`] so callers only ever see error classes.

use crate::error::{classify_response, classify_transport, VenueError, VenueResult};
use crate::sign::{signed_query, QueryString};
use pincer_core::{
    ClientOrderId, Order, OrderSide, OrderType, Price, Size, Symbol, TimeInForce,
};
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Order endpoint path.
const ORDER_PATH: &str = "/api/v3/order";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Parameters for a new order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Size,
    /// Limit price. Market orders carry none.
    pub price: Option<Price>,
    pub client_order_id: ClientOrderId,
}

impl OrderRequest {
    /// Resting limit order, good til canceled.
    pub fn limit(symbol: Symbol, side: OrderSide, price: Price, quantity: Size) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            client_order_id: ClientOrderId::new(),
        }
    }

    /// Market order for immediate execution.
    pub fn market(symbol: Symbol, side: OrderSide, quantity: Size) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            client_order_id: ClientOrderId::new(),
        }
    }
}

/// Order payload the venue returns from place, cancel, and query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    symbol: String,
    order_id: u64,
    client_order_id: String,
    /// Present on cancel responses; names the canceled order.
    #[serde(default)]
    orig_client_order_id: Option<String>,
    price: String,
    orig_qty: String,
    executed_qty: String,
    status: pincer_core::OrderStatus,
    #[serde(rename = "type")]
    order_type: OrderType,
    side: OrderSide,
}

impl OrderResponse {
    fn into_order(self) -> VenueResult<Order> {
        let price = parse_decimal(&self.price, "price")?;
        let quantity = parse_decimal(&self.orig_qty, "origQty")?;
        let executed_qty = parse_decimal(&self.executed_qty, "executedQty")?;
        // Cancel responses assign their own clientOrderId; the canceled
        // order's id arrives as origClientOrderId.
        let client_order_id = self.orig_client_order_id.unwrap_or(self.client_order_id);

        Ok(Order {
            order_id: self.order_id,
            client_order_id: ClientOrderId::from_string(client_order_id),
            symbol: Symbol::from(self.symbol),
            side: self.side,
            order_type: self.order_type,
            price: (!price.is_zero()).then(|| Price::new(price)),
            quantity: Size::new(quantity),
            executed_qty: Size::new(executed_qty),
            status: self.status,
        })
    }
}

fn parse_decimal(s: &str, field: &str) -> VenueResult<Decimal> {
    s.parse()
        .map_err(|_| VenueError::Transient(format!("Invalid {field} in order response: {s}")))
}

/// Static order parameters in canonical order. recvWindow, timestamp,
/// and the signature are appended at send time.
fn order_params(request: &OrderRequest) -> QueryString {
    let mut query = QueryString::new()
        .push("symbol", request.symbol.as_str())
        .push("side", request.side.as_str())
        .push("type", request.order_type.as_str());

    if request.order_type == OrderType::Limit {
        query = query.push("timeInForce", TimeInForce::GoodTilCanceled.as_str());
    }

    query
        .push("quantity", &request.quantity)
        .push_opt("price", request.price.as_ref())
        .push("newClientOrderId", &request.client_order_id)
        .push("newOrderRespType", "RESULT")
}

/// Parse a Retry-After header value (whole seconds).
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Signed REST client for order placement, cancelation, and status.
pub struct VenueClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    recv_window_ms: u64,
}

impl VenueClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        recv_window_ms: u64,
    ) -> VenueResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| VenueError::Fatal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            recv_window_ms,
        })
    }

    /// Submit a new order.
    pub async fn place_order(&self, request: &OrderRequest) -> VenueResult<Order> {
        info!(
            symbol = %request.symbol,
            side = %request.side,
            order_type = %request.order_type,
            price = ?request.price,
            quantity = %request.quantity,
            client_order_id = %request.client_order_id,
            "Placing order"
        );

        let params = self.with_auth_window(order_params(request));
        let body = signed_query(&params, &self.api_secret)?;

        let response = self
            .client
            .post(format!("{}{ORDER_PATH}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(classify_transport)?;

        self.handle_order_response(response).await
    }

    /// Cancel an open order by its client order id.
    ///
    /// `AlreadyResolved` here means the venue no longer has the order
    /// open; callers decide what that implies for the cycle.
    pub async fn cancel_order(
        &self,
        symbol: &Symbol,
        client_order_id: &ClientOrderId,
    ) -> VenueResult<Order> {
        info!(symbol = %symbol, client_order_id = %client_order_id, "Canceling order");

        let params = self.with_auth_window(
            QueryString::new()
                .push("symbol", symbol.as_str())
                .push("origClientOrderId", client_order_id),
        );
        let query = signed_query(&params, &self.api_secret)?;

        let response = self
            .client
            .delete(format!("{}{ORDER_PATH}?{query}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(classify_transport)?;

        self.handle_order_response(response).await
    }

    /// Fetch the venue's current view of an order.
    pub async fn get_order_status(
        &self,
        symbol: &Symbol,
        client_order_id: &ClientOrderId,
    ) -> VenueResult<Order> {
        debug!(symbol = %symbol, client_order_id = %client_order_id, "Querying order status");

        let params = self.with_auth_window(
            QueryString::new()
                .push("symbol", symbol.as_str())
                .push("origClientOrderId", client_order_id),
        );
        let query = signed_query(&params, &self.api_secret)?;

        let response = self
            .client
            .get(format!("{}{ORDER_PATH}?{query}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(classify_transport)?;

        self.handle_order_response(response).await
    }

    /// Append recvWindow and timestamp, the final parameters before
    /// the signature.
    fn with_auth_window(&self, query: QueryString) -> QueryString {
        query
            .push("recvWindow", self.recv_window_ms)
            .push("timestamp", chrono::Utc::now().timestamp_millis())
    }

    async fn handle_order_response(&self, response: Response) -> VenueResult<Order> {
        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            return Err(classify_response(status, retry_after, &body));
        }

        let parsed: OrderResponse = serde_json::from_str(&body)
            .map_err(|e| VenueError::Transient(format!("Failed to parse order response: {e}")))?;
        let order = parsed.into_order()?;

        debug!(
            order_id = order.order_id,
            status = %order.status,
            executed_qty = %order.executed_qty,
            "Order response"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pincer_core::OrderStatus;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_order_params_limit() {
        let mut request = OrderRequest::limit(
            Symbol::from("BTCBUSD"),
            OrderSide::Buy,
            Price::new(dec!(98.00)),
            Size::new(dec!(0.153)),
        );
        request.client_order_id = ClientOrderId::from_string("pincer_test_1".to_string());

        assert_eq!(
            order_params(&request).encode(),
            "symbol=BTCBUSD&side=BUY&type=LIMIT&timeInForce=GTC&quantity=0.153&price=98.00\
             &newClientOrderId=pincer_test_1&newOrderRespType=RESULT"
        );
    }

    #[test]
    fn test_order_params_market_omits_price() {
        let mut request = OrderRequest::market(
            Symbol::from("BTCUSD"),
            OrderSide::Sell,
            Size::new(dec!(0.2)),
        );
        request.client_order_id = ClientOrderId::from_string("pincer_test_2".to_string());

        assert_eq!(
            order_params(&request).encode(),
            "symbol=BTCUSD&side=SELL&type=MARKET&quantity=0.2\
             &newClientOrderId=pincer_test_2&newOrderRespType=RESULT"
        );
    }

    #[test]
    fn test_place_response_maps_to_order() {
        let body = json!({
            "symbol": "BTCBUSD",
            "orderId": 28,
            "orderListId": -1,
            "clientOrderId": "pincer_1700000000000_ab12cd34",
            "transactTime": 1507725176595u64,
            "price": "98.00",
            "origQty": "0.153",
            "executedQty": "0.000",
            "cummulativeQuoteQty": "0.00",
            "status": "NEW",
            "timeInForce": "GTC",
            "type": "LIMIT",
            "side": "BUY"
        });

        let parsed: OrderResponse = serde_json::from_value(body).unwrap();
        let order = parsed.into_order().unwrap();

        assert_eq!(order.order_id, 28);
        assert_eq!(order.symbol.as_str(), "BTCBUSD");
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.price, Some(Price::new(dec!(98.00))));
        assert_eq!(order.quantity, Size::new(dec!(0.153)));
        assert!(order.executed_qty.is_zero());
    }

    #[test]
    fn test_cancel_response_keeps_original_id() {
        let body = json!({
            "symbol": "BTCBUSD",
            "orderId": 28,
            "origClientOrderId": "pincer_entry_1",
            "clientOrderId": "cancel_xyz",
            "price": "98.00",
            "origQty": "0.153",
            "executedQty": "0.061",
            "status": "CANCELED",
            "type": "LIMIT",
            "side": "BUY"
        });

        let parsed: OrderResponse = serde_json::from_value(body).unwrap();
        let order = parsed.into_order().unwrap();

        assert_eq!(order.client_order_id.as_str(), "pincer_entry_1");
        assert_eq!(order.status, OrderStatus::Canceled);
        assert_eq!(order.executed_qty, Size::new(dec!(0.061)));
    }

    #[test]
    fn test_market_response_has_no_price() {
        let body = json!({
            "symbol": "BTCUSD",
            "orderId": 99,
            "clientOrderId": "pincer_exit_7",
            "price": "0.00000000",
            "origQty": "0.061",
            "executedQty": "0.061",
            "status": "FILLED",
            "type": "MARKET",
            "side": "SELL"
        });

        let parsed: OrderResponse = serde_json::from_value(body).unwrap();
        let order = parsed.into_order().unwrap();

        assert!(order.price.is_none());
        assert!(order.is_filled());
    }

    #[test]
    fn test_order_response_invalid_decimal() {
        let body = json!({
            "symbol": "BTCUSD",
            "orderId": 99,
            "clientOrderId": "pincer_exit_7",
            "price": "garbage",
            "origQty": "0.061",
            "executedQty": "0.061",
            "status": "FILLED",
            "type": "MARKET",
            "side": "SELL"
        });

        let parsed: OrderResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(
            parsed.into_order(),
            Err(VenueError::Transient(_))
        ));
    }
}
