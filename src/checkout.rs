//! Checkout lifecycle: session initiation and the pending -> completed
//! transition. HTTP-free; storage and the payment processor sit behind
//! ports so the flows are testable without a database.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::payments::{LineItem, PaymentConfirmation, PaymentGateway, SessionRequest};
use crate::types::order::{order_total, CartItem, Order, OrderItem, OrderStatus};
use crate::types::user::Caller;

/// Narrow storage port for the order lifecycle. `PgPool` implements it in
/// `persistence::orders`.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<(), AppError>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError>;
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<(), AppError>;
}

/// Redirect targets handed to the payment processor.
#[derive(Debug, Clone)]
pub struct ReturnUrls {
    pub app_base_url: String,
}

impl ReturnUrls {
    pub fn success_for(&self, order_id: Uuid) -> String {
        format!("{}/orders/success/{order_id}", self.app_base_url)
    }

    pub fn cancel(&self) -> String {
        format!("{}/cart", self.app_base_url)
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutStarted {
    pub order_id: Uuid,
    pub redirect_url: String,
}

/// Start a checkout: persist a pending order with price snapshots, then ask
/// the processor for a hosted session.
///
/// The order is written before the processor is contacted, so a paid order
/// can never be missing from the store. The inverse (a pending order whose
/// payment was abandoned or failed) is accepted and left in place; there is
/// no compensating cleanup and no retry.
pub async fn begin_checkout(
    store: &dyn CheckoutStore,
    gateway: &dyn PaymentGateway,
    caller: Option<&Caller>,
    cart: &[CartItem],
    urls: &ReturnUrls,
) -> Result<CheckoutStarted, AppError> {
    let caller = caller.ok_or(AppError::Unauthorized)?;
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let order = Order {
        id: Uuid::new_v4(),
        user_id: caller.user_id,
        total: order_total(cart),
        status: OrderStatus::Pending,
        created_at: Utc::now(),
    };
    let items: Vec<OrderItem> = cart
        .iter()
        .map(|line| OrderItem {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: line.id,
            price: line.price,
        })
        .collect();

    store.insert_order(&order, &items).await?;
    info!(order_id = %order.id, total = order.total, "created pending order");

    let request = SessionRequest {
        order_id: order.id,
        user_id: caller.user_id,
        line_items: cart
            .iter()
            .map(|line| LineItem {
                name: line.name.clone(),
                image: line.image.clone(),
                unit_amount: line.price,
            })
            .collect(),
        success_url: urls.success_for(order.id),
        cancel_url: urls.cancel(),
    };

    match gateway.create_checkout_session(&request).await {
        Ok(session) => Ok(CheckoutStarted {
            order_id: order.id,
            redirect_url: session.url,
        }),
        Err(err) => {
            warn!(order_id = %order.id, error = %err, "session creation failed; pending order left in place");
            Err(AppError::Payment(err.to_string()))
        }
    }
}

/// What a completion trigger did to the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed,
    Unchanged,
}

/// Success-page view: looks the order up, checks ownership, and applies the
/// guarded transition. A missing order and a foreign-owned order both read
/// as `NotFound`, so order ids cannot be probed for existence.
///
/// Viewing the page is itself a completion trigger; repeat views are no-ops.
pub async fn view_success(
    store: &dyn CheckoutStore,
    caller: &Caller,
    order_id: Uuid,
) -> Result<(Order, Completion), AppError> {
    let mut order = store
        .get_order(order_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.user_id != caller.user_id {
        return Err(AppError::NotFound);
    }
    let outcome = apply_completion(store, &mut order).await?;
    Ok((order, outcome))
}

/// Verified processor confirmation. Same guarded transition as the success
/// view; no ownership check, the channel itself is authenticated.
pub async fn confirm_payment(
    store: &dyn CheckoutStore,
    confirmation: &PaymentConfirmation,
) -> Result<Completion, AppError> {
    let mut order = store
        .get_order(confirmation.order_id)
        .await?
        .ok_or(AppError::NotFound)?;
    apply_completion(store, &mut order).await
}

async fn apply_completion(
    store: &dyn CheckoutStore,
    order: &mut Order,
) -> Result<Completion, AppError> {
    if !order.status.can_complete() {
        return Ok(Completion::Unchanged);
    }
    store
        .set_order_status(order.id, OrderStatus::Completed)
        .await?;
    order.status = OrderStatus::Completed;
    info!(order_id = %order.id, "order completed");
    Ok(Completion::Completed)
}
