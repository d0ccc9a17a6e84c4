//! Review persistence: insert, per-product listing, moderation delete.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::review::Review;

#[derive(Debug, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

pub fn review_row_to_review(row: &ReviewRow) -> Review {
    Review {
        id: row.id,
        product_id: row.product_id,
        user_id: row.user_id,
        rating: row.rating,
        comment: row.comment.clone(),
        created_at: row.created_at,
    }
}

pub async fn insert_review(pool: &PgPool, review: &Review) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO reviews (id, product_id, user_id, rating, comment, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(review.id)
    .bind(review.product_id)
    .bind(review.user_id)
    .bind(review.rating)
    .bind(&review.comment)
    .bind(review.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Reviews for one product, most recent first.
pub async fn list_reviews_for_product(
    pool: &PgPool,
    product_id: Uuid,
) -> Result<Vec<ReviewRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, product_id, user_id, rating, comment, created_at \
         FROM reviews WHERE product_id = $1 ORDER BY created_at DESC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn delete_review(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
