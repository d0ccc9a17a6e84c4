//! User persistence: signup, login lookup, and the recent-signup feed.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::user::Role;

/// Row returned from DB (username is stored lowercase).
#[derive(FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Get a user by username (lowercase). For login.
pub async fn get_user_by_username(
    pool: &PgPool,
    username_lowercase: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, role, created_at FROM users WHERE username = $1",
    )
    .bind(username_lowercase)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert a user. Username must already be lowercase.
pub async fn insert_user(
    pool: &PgPool,
    id: Uuid,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, username, password_hash, role, created_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(username)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent customer signups, for the dashboard feed. Admin accounts are
/// not part of the feed.
pub async fn list_recent_signups(
    pool: &PgPool,
    limit: usize,
) -> Result<Vec<UserRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, role, created_at \
         FROM users WHERE role = 'user' ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
