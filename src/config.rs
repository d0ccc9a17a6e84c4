//! Environment configuration, loaded once at startup.

use std::env;

use dotenvy::dotenv;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    /// Public base URL the payment processor redirects back to.
    pub app_base_url: String,
    pub jwt_secret: Vec<u8>,
    pub payment_api_base: String,
    pub payment_secret_key: String,
    pub payment_webhook_token: String,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let require = |name: &str| {
            env::var(name)
                .map_err(|_| AppError::Config(format!("missing environment variable '{name}'")))
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let app_base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let payment_api_base =
            env::var("PAYMENT_API_BASE").unwrap_or_else(|_| "https://api.stripe.com".to_string());
        let currency = env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string());

        Ok(Self {
            bind_addr,
            database_url: require("DATABASE_URL")?,
            app_base_url,
            jwt_secret: require("JWT_SECRET")?.into_bytes(),
            payment_api_base,
            payment_secret_key: require("PAYMENT_SECRET_KEY")?,
            payment_webhook_token: require("PAYMENT_WEBHOOK_TOKEN")?,
            currency,
        })
    }
}
