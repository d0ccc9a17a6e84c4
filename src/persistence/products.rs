//! Product persistence: catalog CRUD and search filtering.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::product::Product;

#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub tags: Vec<String>,
    pub file_url: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

pub fn product_row_to_product(row: &ProductRow) -> Product {
    Product {
        id: row.id,
        name: row.name.clone(),
        description: row.description.clone(),
        price: row.price,
        category: row.category.clone(),
        tags: row.tags.clone(),
        file_url: row.file_url.clone(),
        image_url: row.image_url.clone(),
        created_at: row.created_at,
    }
}

pub async fn insert_product(pool: &PgPool, product: &Product) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO products (id, name, description, price, category, tags, file_url, image_url, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.category)
    .bind(&product.tags)
    .bind(&product.file_url)
    .bind(&product.image_url)
    .bind(product.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Overwrite an existing product. Returns false when the id is unknown.
pub async fn update_product(pool: &PgPool, product: &Product) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE products SET name = $1, description = $2, price = $3, category = $4, \
         tags = $5, file_url = $6, image_url = $7 WHERE id = $8",
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.category)
    .bind(&product.tags)
    .bind(&product.file_url)
    .bind(&product.image_url)
    .bind(product.id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_product_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<ProductRow>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, description, price, category, tags, file_url, image_url, created_at \
         FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Catalog listing with optional term, category, and tag filters. The term
/// matches name or description, case-insensitively.
pub async fn search_products(
    pool: &PgPool,
    term: Option<&str>,
    category: Option<&str>,
    tag: Option<&str>,
) -> Result<Vec<ProductRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, description, price, category, tags, file_url, image_url, created_at \
         FROM products \
         WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%') \
           AND ($2::text IS NULL OR category = $2) \
           AND ($3::text IS NULL OR $3 = ANY(tags)) \
         ORDER BY created_at DESC",
    )
    .bind(term)
    .bind(category)
    .bind(tag)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
