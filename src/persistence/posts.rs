//! Insights post persistence, slug-addressed.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::post::Post;

#[derive(Debug, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn post_row_to_post(row: &PostRow) -> Post {
    Post {
        id: row.id,
        slug: row.slug.clone(),
        title: row.title.clone(),
        body: row.body.clone(),
        cover_url: row.cover_url.clone(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub async fn insert_post(pool: &PgPool, post: &Post) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO posts (id, slug, title, body, cover_url, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(post.id)
    .bind(&post.slug)
    .bind(&post.title)
    .bind(&post.body)
    .bind(&post.cover_url)
    .bind(post.created_at)
    .bind(post.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Rewrite a post's content under its slug. Returns false for unknown slugs.
pub async fn update_post_by_slug(
    pool: &PgPool,
    slug: &str,
    title: &str,
    body: &str,
    cover_url: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE posts SET title = $1, body = $2, cover_url = $3, updated_at = $4 WHERE slug = $5",
    )
    .bind(title)
    .bind(body)
    .bind(cover_url)
    .bind(Utc::now())
    .bind(slug)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_post_by_slug(pool: &PgPool, slug: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE slug = $1")
        .bind(slug)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn get_post_by_slug(pool: &PgPool, slug: &str) -> Result<Option<PostRow>, sqlx::Error> {
    let row = sqlx::query_as::<_, PostRow>(
        "SELECT id, slug, title, body, cover_url, created_at, updated_at \
         FROM posts WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// All posts, most recent first.
pub async fn list_posts(pool: &PgPool) -> Result<Vec<PostRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT id, slug, title, body, cover_url, created_at, updated_at \
         FROM posts ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
