use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Money is carried in minor currency units end to end.
pub type Cents = i64;
pub type OrderId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// The lifecycle has a single transition: Pending -> Completed.
    /// Completed and Cancelled orders never change again.
    pub fn can_complete(self) -> bool {
        matches!(self, OrderStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Uuid,
    pub total: Cents,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// A line of an order: product reference plus the price captured at purchase
/// time. The snapshot is never re-read from the product afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: OrderId,
    pub product_id: Uuid,
    pub price: Cents,
}

/// One cart line as submitted at checkout. There is no quantity field;
/// every line counts once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub name: String,
    pub price: Cents,
    pub image: Option<String>,
}

/// Order total: the sum of the cart's unit prices.
pub fn order_total(cart: &[CartItem]) -> Cents {
    cart.iter().map(|line| line.price).sum()
}

/// Two-decimal display form. Formatting only, no unit conversion.
pub fn format_cents(amount: Cents) -> String {
    format!("{}.{:02}", amount / 100, (amount % 100).abs())
}
