use std::sync::Arc;

use themes_jet::api::routes::{app_router, AppState};
use themes_jet::authz::{AccessPolicy, RolePolicy};
use themes_jet::config::AppConfig;
use themes_jet::payments::{HostedCheckout, PaymentGateway};
use themes_jet::persistence::create_pool_and_migrate;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Arc::new(AppConfig::from_env().expect("configuration"));
    let pool = create_pool_and_migrate(&config.database_url)
        .await
        .expect("database");

    let gateway: Arc<dyn PaymentGateway> = Arc::new(HostedCheckout::new(
        &config.payment_api_base,
        &config.payment_secret_key,
        &config.payment_webhook_token,
        &config.currency,
    ));
    let policy: Arc<dyn AccessPolicy> = Arc::new(RolePolicy);

    let app_state = AppState {
        pool,
        gateway,
        policy,
        config: config.clone(),
    };

    let app = app_router(app_state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .unwrap();
    tracing::info!(addr = %config.bind_addr, "themes-jet listening");
    axum::serve(listener, app).await.unwrap();
}
