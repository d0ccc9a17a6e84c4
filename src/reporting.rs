//! Admin read-side aggregations: revenue stats, the monthly chart, and the
//! dashboard notification feed. Pure functions over rows the handlers fetch;
//! testable without HTTP or a database.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::order::{format_cents, Cents, Order, OrderStatus};

/// Revenue from the last N days counts as not yet cleared for payout.
const CLEARANCE_WINDOW_DAYS: i64 = 3;

/// Floor for the chart's scaling denominator, so an empty window never
/// divides by zero.
const MIN_CHART_DENOMINATOR: Cents = 100;

/// The chart always renders these twelve labels, in calendar order.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// How many entries each dashboard feed fetches and the merge keeps.
pub const DASHBOARD_FEED_LIMIT: usize = 5;

/// One completed order as the aggregations see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueEntry {
    pub total: Cents,
    pub created_at: DateTime<Utc>,
}

/// Keep only completed orders; pending and cancelled never count as revenue.
pub fn revenue_entries(orders: &[Order]) -> Vec<RevenueEntry> {
    orders
        .iter()
        .filter(|order| order.status == OrderStatus::Completed)
        .map(|order| RevenueEntry {
            total: order.total,
            created_at: order.created_at,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueStats {
    pub lifetime: Cents,
    pub pending_clearance: Cents,
    pub available_payout: Cents,
}

/// Lifetime sum, the 3-day clearance window sum, and the payout left over.
/// The payout never goes negative.
pub fn revenue_stats(completed: &[RevenueEntry], now: DateTime<Utc>) -> RevenueStats {
    let lifetime: Cents = completed.iter().map(|entry| entry.total).sum();
    let cutoff = now - Duration::days(CLEARANCE_WINDOW_DAYS);
    let pending_clearance: Cents = completed
        .iter()
        .filter(|entry| entry.created_at > cutoff)
        .map(|entry| entry.total)
        .sum();
    RevenueStats {
        lifetime,
        pending_clearance,
        available_payout: (lifetime - pending_clearance).max(0),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub label: &'static str,
    pub total: Cents,
    pub height_pct: i64,
}

/// Bucket totals by calendar month name. The year is not part of the key:
/// a March order from any sampled year lands in the same "Mar" bucket. All
/// twelve buckets are emitted even when empty, Jan through Dec, and bar
/// heights scale against the largest bucket.
pub fn monthly_chart(completed: &[RevenueEntry]) -> Vec<MonthBucket> {
    let mut totals = [0 as Cents; 12];
    for entry in completed {
        totals[entry.created_at.month0() as usize] += entry.total;
    }
    let denominator = totals
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .max(MIN_CHART_DENOMINATOR);
    MONTH_LABELS
        .into_iter()
        .zip(totals)
        .map(|(label, total)| MonthBucket {
            label,
            total,
            height_pct: total * 100 / denominator,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Order,
    Signup,
}

/// Uniform dashboard notification shape for both feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub desc: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

pub fn order_notification(id: Uuid, total: Cents, date: DateTime<Utc>) -> Notification {
    Notification {
        id,
        title: "New order".to_string(),
        desc: format!("Order placed for {}", format_cents(total)),
        date,
        kind: NotificationKind::Order,
    }
}

pub fn signup_notification(id: Uuid, username: &str, date: DateTime<Utc>) -> Notification {
    Notification {
        id,
        title: "New member".to_string(),
        desc: format!("{username} joined"),
        date,
        kind: NotificationKind::Signup,
    }
}

/// Merge the two feeds: orders first, then signups, stable-sorted by date
/// descending and truncated. Equal timestamps keep concatenation order.
pub fn merge_notifications(
    orders: Vec<Notification>,
    signups: Vec<Notification>,
    limit: usize,
) -> Vec<Notification> {
    let mut merged = orders;
    merged.extend(signups);
    merged.sort_by(|a, b| b.date.cmp(&a.date));
    merged.truncate(limit);
    merged
}
