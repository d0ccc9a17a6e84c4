//! Router, shared state, and HTTP handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::auth::{self, Authenticated, MaybeAuthenticated};
use crate::authz::{authorize, AccessPolicy, AdminAction};
use crate::checkout::{begin_checkout, confirm_payment, view_success, ReturnUrls};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::payments::PaymentGateway;
use crate::persistence;
use crate::persistence::OrderItemRow;
use crate::reporting::{
    merge_notifications, monthly_chart, order_notification, revenue_entries, revenue_stats,
    signup_notification, MonthBucket, Notification, RevenueStats, DASHBOARD_FEED_LIMIT,
};
use crate::types::order::{format_cents, CartItem, Order, OrderStatus};
use crate::types::post::Post;
use crate::types::product::Product;
use crate::types::review::Review;
use crate::types::user::Role;

/// Completed orders sampled for the monthly chart.
const CHART_SAMPLE_LIMIT: usize = 100;

/// Orders shown on the admin order listing.
const ADMIN_ORDER_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub gateway: Arc<dyn PaymentGateway>,
    pub policy: Arc<dyn AccessPolicy>,
    pub config: Arc<AppConfig>,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/products/{id}/reviews",
            get(list_reviews).post(create_review),
        )
        .route("/reviews/{id}", delete(delete_review))
        .route("/insights", get(list_insights).post(create_insight))
        .route(
            "/insights/{slug}",
            get(get_insight).put(update_insight).delete(delete_insight),
        )
        .route("/checkout", post(start_checkout))
        .route("/orders/me", get(my_orders))
        .route("/orders/success/{id}", get(order_success))
        .route("/webhooks/payment", post(payment_webhook))
        .route("/admin/stats", get(admin_stats))
        .route("/admin/notifications", get(admin_notifications))
        .route("/admin/orders", get(admin_orders))
        .with_state(state)
}

async fn health() -> &'static str {
    "healthy"
}

// --- Accounts ---

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct RegisterResponse {
    user_id: Uuid,
    username: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let username = req.username.trim().to_lowercase();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    }
    if persistence::get_user_by_username(&state.pool, &username)
        .await?
        .is_some()
    {
        return Err(AppError::Validation("username already taken".to_string()));
    }

    let user_id = Uuid::new_v4();
    let password_hash = auth::hash_password(&req.password)?;
    persistence::insert_user(&state.pool, user_id, &username, &password_hash, Role::User).await?;
    tracing::info!(%user_id, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, username }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let username = req.username.trim().to_lowercase();
    let user = persistence::get_user_by_username(&state.pool, &username)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }
    let role = Role::parse(&user.role).ok_or(AppError::Unauthorized)?;
    let token = auth::create_token(&state.config.jwt_secret, user.id, role)
        .map_err(|e| AppError::Internal(format!("token creation failed: {e}")))?;
    Ok(Json(LoginResponse { token }))
}

// --- Catalog ---

#[derive(Deserialize)]
struct ProductQuery {
    q: Option<String>,
    category: Option<String>,
    tag: Option<String>,
}

#[derive(Deserialize)]
struct ProductPayload {
    name: String,
    description: String,
    price: i64,
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    file_url: String,
    image_url: String,
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let rows = persistence::search_products(
        &state.pool,
        query.q.as_deref(),
        query.category.as_deref(),
        query.tag.as_deref(),
    )
    .await?;
    Ok(Json(
        rows.iter().map(persistence::product_row_to_product).collect(),
    ))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let row = persistence::get_product_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(persistence::product_row_to_product(&row)))
}

async fn create_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ManageCatalog)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("product name is required".to_string()));
    }
    let product = Product {
        id: Uuid::new_v4(),
        name: payload.name,
        description: payload.description,
        price: payload.price,
        category: payload.category,
        tags: payload.tags,
        file_url: payload.file_url,
        image_url: payload.image_url,
        created_at: Utc::now(),
    };
    persistence::insert_product(&state.pool, &product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ManageCatalog)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("product name is required".to_string()));
    }
    let existing = persistence::get_product_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let product = Product {
        id,
        name: payload.name,
        description: payload.description,
        price: payload.price,
        category: payload.category,
        tags: payload.tags,
        file_url: payload.file_url,
        image_url: payload.image_url,
        created_at: existing.created_at,
    };
    if !persistence::update_product(&state.pool, &product).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ManageCatalog)?;
    if !persistence::delete_product(&state.pool, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- Reviews ---

#[derive(Deserialize)]
struct ReviewPayload {
    rating: i32,
    comment: String,
}

async fn list_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>, AppError> {
    if persistence::get_product_by_id(&state.pool, product_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }
    let rows = persistence::list_reviews_for_product(&state.pool, product_id).await?;
    Ok(Json(
        rows.iter().map(persistence::review_row_to_review).collect(),
    ))
}

async fn create_review(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<ReviewPayload>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    if payload.comment.trim().is_empty() {
        return Err(AppError::Validation("comment is required".to_string()));
    }
    if persistence::get_product_by_id(&state.pool, product_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }
    let review = Review {
        id: Uuid::new_v4(),
        product_id,
        user_id: caller.user_id,
        rating: payload.rating,
        comment: payload.comment,
        created_at: Utc::now(),
    };
    persistence::insert_review(&state.pool, &review).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn delete_review(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ModerateReviews)?;
    if !persistence::delete_review(&state.pool, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- Insights ---

#[derive(Deserialize)]
struct InsightPayload {
    slug: Option<String>,
    title: String,
    body: String,
    cover_url: Option<String>,
}

async fn list_insights(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    let rows = persistence::list_posts(&state.pool).await?;
    Ok(Json(rows.iter().map(persistence::post_row_to_post).collect()))
}

async fn get_insight(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Post>, AppError> {
    let row = persistence::get_post_by_slug(&state.pool, &slug)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(persistence::post_row_to_post(&row)))
}

async fn create_insight(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Json(payload): Json<InsightPayload>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ManageInsights)?;
    let slug = payload
        .slug
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if slug.is_empty() || payload.title.trim().is_empty() {
        return Err(AppError::Validation(
            "slug and title are required".to_string(),
        ));
    }
    if persistence::get_post_by_slug(&state.pool, &slug)
        .await?
        .is_some()
    {
        return Err(AppError::Validation("slug already in use".to_string()));
    }
    let now = Utc::now();
    let post = Post {
        id: Uuid::new_v4(),
        slug,
        title: payload.title,
        body: payload.body,
        cover_url: payload.cover_url,
        created_at: now,
        updated_at: now,
    };
    persistence::insert_post(&state.pool, &post).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_insight(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(slug): Path<String>,
    Json(payload): Json<InsightPayload>,
) -> Result<Json<Post>, AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ManageInsights)?;
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }
    if !persistence::update_post_by_slug(
        &state.pool,
        &slug,
        &payload.title,
        &payload.body,
        payload.cover_url.as_deref(),
    )
    .await?
    {
        return Err(AppError::NotFound);
    }
    let row = persistence::get_post_by_slug(&state.pool, &slug)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(persistence::post_row_to_post(&row)))
}

async fn delete_insight(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ManageInsights)?;
    if !persistence::delete_post_by_slug(&state.pool, &slug).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- Checkout & orders ---

#[derive(Deserialize)]
struct CheckoutRequest {
    items: Vec<CartItem>,
}

#[derive(Serialize)]
struct CheckoutResponse {
    order_id: Uuid,
    url: String,
}

async fn start_checkout(
    State(state): State<AppState>,
    MaybeAuthenticated(caller): MaybeAuthenticated,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let urls = ReturnUrls {
        app_base_url: state.config.app_base_url.clone(),
    };
    let started = begin_checkout(
        &state.pool,
        state.gateway.as_ref(),
        caller.as_ref(),
        &req.items,
        &urls,
    )
    .await?;
    Ok(Json(CheckoutResponse {
        order_id: started.order_id,
        url: started.redirect_url,
    }))
}

#[derive(Serialize)]
struct OrderItemView {
    product_id: Uuid,
    price: i64,
    price_display: String,
}

#[derive(Serialize)]
struct OrderView {
    id: Uuid,
    status: OrderStatus,
    total: i64,
    total_display: String,
    created_at: DateTime<Utc>,
    items: Vec<OrderItemView>,
}

fn order_view(order: &Order, items: &[OrderItemRow]) -> OrderView {
    OrderView {
        id: order.id,
        status: order.status,
        total: order.total,
        total_display: format_cents(order.total),
        created_at: order.created_at,
        items: items
            .iter()
            .map(|item| OrderItemView {
                product_id: item.product_id,
                price: item.price,
                price_display: format_cents(item.price),
            })
            .collect(),
    }
}

async fn order_success(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, AppError> {
    let (order, _outcome) = view_success(&state.pool, &caller, order_id).await?;
    let items = persistence::list_items_for_order(&state.pool, order.id).await?;
    Ok(Json(order_view(&order, &items)))
}

async fn my_orders(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<OrderView>>, AppError> {
    let rows = persistence::list_orders_for_user(&state.pool, caller.user_id).await?;
    let mut views = Vec::with_capacity(rows.len());
    for row in &rows {
        let Some(order) = persistence::order_row_to_order(row) else {
            continue;
        };
        let items = persistence::list_items_for_order(&state.pool, order.id).await?;
        views.push(order_view(&order, &items));
    }
    Ok(Json(views))
}

async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = headers
        .get("x-webhook-token")
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let confirmation = state.gateway.verify_confirmation(&body, token)?;
    confirm_payment(&state.pool, &confirmation).await?;
    Ok(Json(json!({ "received": true })))
}

// --- Admin reporting ---

#[derive(Serialize)]
struct StatsResponse {
    revenue: RevenueStats,
    chart: Vec<MonthBucket>,
}

async fn admin_stats(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<StatsResponse>, AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ViewReports)?;

    let completed_rows = persistence::list_completed_orders(&state.pool).await?;
    let completed: Vec<Order> = completed_rows
        .iter()
        .filter_map(persistence::order_row_to_order)
        .collect();
    let revenue = revenue_stats(&revenue_entries(&completed), Utc::now());

    let window_rows =
        persistence::list_recent_completed_orders(&state.pool, CHART_SAMPLE_LIMIT).await?;
    let window: Vec<Order> = window_rows
        .iter()
        .filter_map(persistence::order_row_to_order)
        .collect();
    let chart = monthly_chart(&revenue_entries(&window));

    Ok(Json(StatsResponse { revenue, chart }))
}

async fn admin_notifications(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<Notification>>, AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ViewReports)?;

    let order_rows = persistence::list_recent_orders(&state.pool, DASHBOARD_FEED_LIMIT).await?;
    let orders = order_rows
        .iter()
        .map(|row| order_notification(row.id, row.total, row.created_at))
        .collect();
    let signup_rows = persistence::list_recent_signups(&state.pool, DASHBOARD_FEED_LIMIT).await?;
    let signups = signup_rows
        .iter()
        .map(|row| signup_notification(row.id, &row.username, row.created_at))
        .collect();

    Ok(Json(merge_notifications(
        orders,
        signups,
        DASHBOARD_FEED_LIMIT,
    )))
}

async fn admin_orders(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<Order>>, AppError> {
    authorize(state.policy.as_ref(), &caller, AdminAction::ViewReports)?;
    let rows = persistence::list_recent_orders(&state.pool, ADMIN_ORDER_LIMIT).await?;
    Ok(Json(
        rows.iter()
            .filter_map(persistence::order_row_to_order)
            .collect(),
    ))
}
