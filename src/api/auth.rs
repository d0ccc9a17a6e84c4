//! JWT auth: claims, token creation/validation, password hashing, and the
//! caller extractors used by the handlers.

use std::convert::Infallible;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::routes::AppState;
use crate::error::AppError;
use crate::types::user::{Caller, Role};

/// JWT claims: `sub` = user id (Uuid as string), `role`, `exp` (expiry),
/// `iat` (issued at).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

const JWT_EXPIRY_HOURS: i64 = 24;

impl Claims {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        let now = chrono::Utc::now();
        let exp = (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp();
        Self {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            exp,
            iat: now.timestamp(),
        }
    }
}

pub fn create_token(
    secret: &[u8],
    user_id: Uuid,
    role: Role,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(user_id, role);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token(secret: &[u8], token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?;
    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn caller_from_parts(parts: &Parts, state: &AppState) -> Result<Caller, AppError> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;
    let claims =
        decode_token(&state.config.jwt_secret, token).map_err(|_| AppError::Unauthorized)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
    let role = Role::parse(&claims.role).ok_or(AppError::Unauthorized)?;
    Ok(Caller { user_id, role })
}

/// The verified caller, rejecting with 401 when the Bearer token is missing
/// or invalid.
pub struct Authenticated(pub Caller);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        caller_from_parts(parts, state).map(Authenticated)
    }
}

/// Like `Authenticated`, but yields `None` instead of rejecting so the
/// operation itself decides what an anonymous caller means.
pub struct MaybeAuthenticated(pub Option<Caller>);

impl FromRequestParts<AppState> for MaybeAuthenticated {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthenticated(caller_from_parts(parts, state).ok()))
    }
}
