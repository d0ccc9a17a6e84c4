use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::order::Cents;

/// Catalog entry. Admin-mutable; price changes never touch the snapshots in
/// past order items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Cents,
    pub category: String,
    pub tags: Vec<String>,
    pub file_url: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}
