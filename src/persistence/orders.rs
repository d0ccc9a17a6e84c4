//! Order persistence: creation with item snapshots, status transitions, and
//! the read sets the admin aggregations consume.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::checkout::CheckoutStore;
use crate::error::AppError;
use crate::types::order::{Order, OrderItem, OrderStatus};

fn status_to_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Pending",
        OrderStatus::Completed => "Completed",
        OrderStatus::Cancelled => "Cancelled",
    }
}

fn str_to_status(s: &str) -> Option<OrderStatus> {
    match s {
        "Pending" => Some(OrderStatus::Pending),
        "Completed" => Some(OrderStatus::Completed),
        "Cancelled" => Some(OrderStatus::Cancelled),
        _ => None,
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub price: i64,
}

/// Convert a row to the domain order. Rows with an unknown status are skipped.
pub fn order_row_to_order(row: &OrderRow) -> Option<Order> {
    let status = str_to_status(&row.status)?;
    Some(Order {
        id: row.id,
        user_id: row.user_id,
        total: row.total,
        status,
        created_at: row.created_at,
    })
}

/// Insert an order and its item snapshots in a single transaction.
pub async fn insert_order_with_items(
    pool: &PgPool,
    order: &Order,
    items: &[OrderItem],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO orders (id, user_id, total, status, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.total)
    .bind(status_to_str(order.status))
    .bind(order.created_at)
    .execute(&mut *tx)
    .await?;
    for item in items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, price) VALUES ($1, $2, $3, $4)",
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.price)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

/// Get a single order by id.
pub async fn get_order_by_id(
    pool: &PgPool,
    order_id: Uuid,
) -> Result<Option<OrderRow>, sqlx::Error> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, total, status, created_at FROM orders WHERE id = $1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Update order status (the completion transition).
pub async fn update_order_status(
    pool: &PgPool,
    id: Uuid,
    status: OrderStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
        .bind(status_to_str(status))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Item snapshots for one order, in insertion order.
pub async fn list_items_for_order(
    pool: &PgPool,
    order_id: Uuid,
) -> Result<Vec<OrderItemRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, price FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// A user's order history, most recent first.
pub async fn list_orders_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<OrderRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, total, status, created_at \
         FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All completed orders, for the revenue totals.
pub async fn list_completed_orders(pool: &PgPool) -> Result<Vec<OrderRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, total, status, created_at \
         FROM orders WHERE status = 'Completed' ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// The most recent completed orders, returned ascending by time, for the
/// monthly chart's sampling window.
pub async fn list_recent_completed_orders(
    pool: &PgPool,
    limit: usize,
) -> Result<Vec<OrderRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, total, status, created_at FROM ( \
            SELECT id, user_id, total, status, created_at \
            FROM orders WHERE status = 'Completed' \
            ORDER BY created_at DESC LIMIT $1 \
         ) recent ORDER BY created_at",
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Most recent orders regardless of status, for the dashboard feed and the
/// admin order listing.
pub async fn list_recent_orders(pool: &PgPool, limit: usize) -> Result<Vec<OrderRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, user_id, total, status, created_at \
         FROM orders ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[async_trait]
impl CheckoutStore for PgPool {
    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<(), AppError> {
        insert_order_with_items(self, order, items)
            .await
            .map_err(AppError::from)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let row = get_order_by_id(self, id).await?;
        Ok(row.as_ref().and_then(order_row_to_order))
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<(), AppError> {
        update_order_status(self, id, status)
            .await
            .map_err(AppError::from)
    }
}
