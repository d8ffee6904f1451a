//! Venue order operations behind a trait.
//!
//! Cycles run against this abstraction so the same lifecycle code
//! drives the live REST client in production and a scripted double in
//! tests.

use pincer_core::{ClientOrderId, Order, Symbol};
use pincer_venue::{OrderRequest, VenueClient, VenueError, VenueResult};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Order operations the lifecycle engine needs from a venue.
pub trait OrderApi: Send + Sync {
    /// Post a new order.
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, VenueResult<Order>>;

    /// Cancel an open order by client id.
    fn cancel_order(
        &self,
        symbol: Symbol,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'_, VenueResult<Order>>;

    /// Query the venue's current view of an order by client id.
    fn get_order_status(
        &self,
        symbol: Symbol,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'_, VenueResult<Order>>;
}

/// Arc wrapper for OrderApi trait objects.
pub type DynOrderApi = Arc<dyn OrderApi>;

// ============================================================================
// LiveOrderApi
// ============================================================================

/// REST-backed implementation.
pub struct LiveOrderApi {
    client: VenueClient,
}

impl LiveOrderApi {
    pub fn new(client: VenueClient) -> Self {
        Self { client }
    }
}

impl OrderApi for LiveOrderApi {
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, VenueResult<Order>> {
        Box::pin(async move { self.client.place_order(&request).await })
    }

    fn cancel_order(
        &self,
        symbol: Symbol,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'_, VenueResult<Order>> {
        Box::pin(async move { self.client.cancel_order(&symbol, &client_order_id).await })
    }

    fn get_order_status(
        &self,
        symbol: Symbol,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'_, VenueResult<Order>> {
        Box::pin(async move { self.client.get_order_status(&symbol, &client_order_id).await })
    }
}

// ============================================================================
// MockOrderApi
// ============================================================================

/// Scripted venue for tests.
///
/// Each operation consumes its scripted results in order and records
/// the call for later verification. An unscripted call fails with a
/// transient error rather than panicking.
#[derive(Debug, Default)]
pub struct MockOrderApi {
    place_results: parking_lot::Mutex<VecDeque<VenueResult<Order>>>,
    cancel_results: parking_lot::Mutex<VecDeque<VenueResult<Order>>>,
    status_results: parking_lot::Mutex<VecDeque<VenueResult<Order>>>,
    placed: parking_lot::Mutex<Vec<OrderRequest>>,
    canceled: parking_lot::Mutex<Vec<ClientOrderId>>,
    status_queries: parking_lot::Mutex<Vec<ClientOrderId>>,
}

impl MockOrderApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next result for `place_order`.
    pub fn script_place(&self, result: VenueResult<Order>) {
        self.place_results.lock().push_back(result);
    }

    /// Queue the next result for `cancel_order`.
    pub fn script_cancel(&self, result: VenueResult<Order>) {
        self.cancel_results.lock().push_back(result);
    }

    /// Queue the next result for `get_order_status`.
    pub fn script_status(&self, result: VenueResult<Order>) {
        self.status_results.lock().push_back(result);
    }

    /// Requests passed to `place_order`, in call order.
    pub fn placed(&self) -> Vec<OrderRequest> {
        self.placed.lock().clone()
    }

    /// Client ids passed to `cancel_order`, in call order.
    pub fn canceled(&self) -> Vec<ClientOrderId> {
        self.canceled.lock().clone()
    }

    /// Client ids passed to `get_order_status`, in call order.
    pub fn status_queries(&self) -> Vec<ClientOrderId> {
        self.status_queries.lock().clone()
    }
}

fn script_exhausted() -> VenueError {
    VenueError::Transient("mock script exhausted".to_string())
}

impl OrderApi for MockOrderApi {
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, VenueResult<Order>> {
        Box::pin(async move {
            self.placed.lock().push(request);
            self.place_results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(script_exhausted()))
        })
    }

    fn cancel_order(
        &self,
        _symbol: Symbol,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'_, VenueResult<Order>> {
        Box::pin(async move {
            self.canceled.lock().push(client_order_id);
            self.cancel_results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(script_exhausted()))
        })
    }

    fn get_order_status(
        &self,
        _symbol: Symbol,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'_, VenueResult<Order>> {
        Box::pin(async move {
            self.status_queries.lock().push(client_order_id);
            self.status_results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(script_exhausted()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pincer_core::{OrderSide, OrderStatus, OrderType, Price, Size, Symbol};
    use rust_decimal_macros::dec;

    fn filled_order(client_order_id: ClientOrderId) -> Order {
        Order {
            order_id: 1,
            client_order_id,
            symbol: Symbol::from("BTCUSD"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            price: Some(Price::new(dec!(100))),
            quantity: Size::new(dec!(0.15)),
            executed_qty: Size::new(dec!(0.15)),
            status: OrderStatus::Filled,
        }
    }

    #[tokio::test]
    async fn test_mock_records_and_replays() {
        let api = MockOrderApi::new();
        let id = ClientOrderId::from("test_1".to_string());
        api.script_place(Ok(filled_order(id.clone())));

        let request = OrderRequest::limit(
            Symbol::from("BTCUSD"),
            OrderSide::Buy,
            Price::new(dec!(100)),
            Size::new(dec!(0.15)),
        );
        let order = api.place_order(request.clone()).await.unwrap();

        assert_eq!(order.client_order_id, id);
        assert_eq!(api.placed().len(), 1);
        assert_eq!(api.placed()[0].client_order_id, request.client_order_id);
    }

    #[tokio::test]
    async fn test_mock_exhausted_script_is_transient() {
        let api = MockOrderApi::new();

        let result = api
            .get_order_status(Symbol::from("BTCUSD"), ClientOrderId::from("x".to_string()))
            .await;

        assert!(matches!(result, Err(VenueError::Transient(_))));
        assert_eq!(api.status_queries().len(), 1);
    }
}
