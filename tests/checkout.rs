//! Checkout lifecycle integration tests: pricing, initiation guards, and the
//! pending -> completed transition.

use std::sync::Mutex;

use async_trait::async_trait;
use themes_jet::checkout::{
    begin_checkout, confirm_payment, view_success, CheckoutStore, Completion, ReturnUrls,
};
use themes_jet::error::AppError;
use themes_jet::payments::{
    HostedSession, PaymentConfirmation, PaymentError, PaymentGateway, SessionRequest,
};
use themes_jet::types::order::{order_total, CartItem, Order, OrderItem, OrderStatus};
use themes_jet::types::user::{Caller, Role};
use uuid::Uuid;

#[derive(Default)]
struct MemoryStore {
    orders: Mutex<Vec<Order>>,
    items: Mutex<Vec<OrderItem>>,
}

impl MemoryStore {
    fn order(&self, id: Uuid) -> Option<Order> {
        self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned()
    }

    fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    fn items_for(&self, order_id: Uuid) -> Vec<OrderItem> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<(), AppError> {
        self.orders.lock().unwrap().push(order.clone());
        self.items.lock().unwrap().extend(items.iter().cloned());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        Ok(self.order(id))
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<(), AppError> {
        if let Some(order) = self.orders.lock().unwrap().iter_mut().find(|o| o.id == id) {
            order.status = status;
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingGateway {
    requests: Mutex<Vec<SessionRequest>>,
    fail: bool,
}

impl RecordingGateway {
    fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_checkout_session(
        &self,
        req: &SessionRequest,
    ) -> Result<HostedSession, PaymentError> {
        self.requests.lock().unwrap().push(req.clone());
        if self.fail {
            return Err(PaymentError::MissingRedirectUrl);
        }
        Ok(HostedSession {
            url: format!("https://pay.example/session/{}", req.order_id),
        })
    }

    fn verify_confirmation(
        &self,
        _body: &[u8],
        _token: &str,
    ) -> Result<PaymentConfirmation, PaymentError> {
        Err(PaymentError::InvalidToken)
    }
}

fn caller() -> Caller {
    Caller {
        user_id: Uuid::new_v4(),
        role: Role::User,
    }
}

fn cart() -> Vec<CartItem> {
    vec![
        CartItem {
            id: Uuid::new_v4(),
            name: "Portfolio theme".to_string(),
            price: 2900,
            image: Some("https://cdn.example/portfolio.png".to_string()),
        },
        CartItem {
            id: Uuid::new_v4(),
            name: "Storefront theme".to_string(),
            price: 4900,
            image: None,
        },
    ]
}

fn urls() -> ReturnUrls {
    ReturnUrls {
        app_base_url: "https://themesjet.example".to_string(),
    }
}

#[test]
fn order_total_sums_unit_prices() {
    let cart = cart();
    assert_eq!(order_total(&cart), 7800);
    assert_eq!(order_total(&[]), 0);
}

#[tokio::test]
async fn checkout_creates_pending_order_with_price_snapshots() {
    let store = MemoryStore::default();
    let gateway = RecordingGateway::default();
    let buyer = caller();
    let cart = cart();

    let started = begin_checkout(&store, &gateway, Some(&buyer), &cart, &urls())
        .await
        .unwrap();

    let order = store.order(started.order_id).unwrap();
    assert_eq!(order.user_id, buyer.user_id);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, order_total(&cart));

    let items = store.items_for(order.id);
    assert_eq!(items.len(), 2);
    for (item, line) in items.iter().zip(&cart) {
        assert_eq!(item.product_id, line.id);
        assert_eq!(item.price, line.price);
    }

    assert_eq!(started.redirect_url, format!("https://pay.example/session/{}", order.id));
}

#[tokio::test]
async fn checkout_hands_order_metadata_and_return_urls_to_gateway() {
    let store = MemoryStore::default();
    let gateway = RecordingGateway::default();
    let buyer = caller();
    let cart = cart();

    let started = begin_checkout(&store, &gateway, Some(&buyer), &cart, &urls())
        .await
        .unwrap();

    let requests = gateway.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.order_id, started.order_id);
    assert_eq!(req.user_id, buyer.user_id);
    assert_eq!(req.line_items.len(), 2);
    assert_eq!(req.line_items[0].unit_amount, 2900);
    assert_eq!(
        req.success_url,
        format!("https://themesjet.example/orders/success/{}", started.order_id)
    );
    assert_eq!(req.cancel_url, "https://themesjet.example/cart");
}

#[tokio::test]
async fn empty_cart_rejected_without_order_or_gateway_call() {
    let store = MemoryStore::default();
    let gateway = RecordingGateway::default();
    let buyer = caller();

    let err = begin_checkout(&store, &gateway, Some(&buyer), &[], &urls())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::EmptyCart));
    assert_eq!(store.order_count(), 0);
    assert_eq!(gateway.request_count(), 0);
}

#[tokio::test]
async fn unauthenticated_rejected_without_order_or_gateway_call() {
    let store = MemoryStore::default();
    let gateway = RecordingGateway::default();

    let err = begin_checkout(&store, &gateway, None, &cart(), &urls())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized));
    assert_eq!(store.order_count(), 0);
    assert_eq!(gateway.request_count(), 0);
}

#[tokio::test]
async fn gateway_failure_leaves_pending_order_in_place() {
    let store = MemoryStore::default();
    let gateway = RecordingGateway::failing();
    let buyer = caller();

    let err = begin_checkout(&store, &gateway, Some(&buyer), &cart(), &urls())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Payment(_)));
    // The pending order is not rolled back when the processor call fails.
    assert_eq!(store.order_count(), 1);
    let order = store.orders.lock().unwrap()[0].clone();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn success_view_completes_then_repeats_as_noop() {
    let store = MemoryStore::default();
    let gateway = RecordingGateway::default();
    let buyer = caller();

    let started = begin_checkout(&store, &gateway, Some(&buyer), &cart(), &urls())
        .await
        .unwrap();

    let (order, outcome) = view_success(&store, &buyer, started.order_id).await.unwrap();
    assert_eq!(outcome, Completion::Completed);
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(store.order(started.order_id).unwrap().status, OrderStatus::Completed);

    let (order, outcome) = view_success(&store, &buyer, started.order_id).await.unwrap();
    assert_eq!(outcome, Completion::Unchanged);
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn success_view_by_non_owner_is_not_found_and_leaves_status() {
    let store = MemoryStore::default();
    let gateway = RecordingGateway::default();
    let buyer = caller();
    let stranger = caller();

    let started = begin_checkout(&store, &gateway, Some(&buyer), &cart(), &urls())
        .await
        .unwrap();

    let err = view_success(&store, &stranger, started.order_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    assert_eq!(store.order(started.order_id).unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn success_view_for_missing_order_is_not_found() {
    let store = MemoryStore::default();
    let buyer = caller();

    let err = view_success(&store, &buyer, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn verified_confirmation_completes_and_is_idempotent() {
    let store = MemoryStore::default();
    let gateway = RecordingGateway::default();
    let buyer = caller();

    let started = begin_checkout(&store, &gateway, Some(&buyer), &cart(), &urls())
        .await
        .unwrap();
    let confirmation = PaymentConfirmation {
        order_id: started.order_id,
    };

    let outcome = confirm_payment(&store, &confirmation).await.unwrap();
    assert_eq!(outcome, Completion::Completed);
    assert_eq!(store.order(started.order_id).unwrap().status, OrderStatus::Completed);

    let outcome = confirm_payment(&store, &confirmation).await.unwrap();
    assert_eq!(outcome, Completion::Unchanged);
}

#[tokio::test]
async fn confirmation_for_unknown_order_is_not_found() {
    let store = MemoryStore::default();
    let confirmation = PaymentConfirmation {
        order_id: Uuid::new_v4(),
    };

    let err = confirm_payment(&store, &confirmation).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}
