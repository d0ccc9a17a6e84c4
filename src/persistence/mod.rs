//! Database layer: pool, migrations, and access for users, products, orders,
//! reviews, and posts.

mod orders;
mod pool;
mod posts;
mod products;
mod reviews;
mod users;

pub use orders::{
    get_order_by_id, insert_order_with_items, list_completed_orders, list_items_for_order,
    list_orders_for_user, list_recent_completed_orders, list_recent_orders, order_row_to_order,
    update_order_status, OrderItemRow, OrderRow,
};
pub use pool::{create_pool_and_migrate, run_migrations};
pub use posts::{
    delete_post_by_slug, get_post_by_slug, insert_post, list_posts, post_row_to_post,
    update_post_by_slug, PostRow,
};
pub use products::{
    delete_product, get_product_by_id, insert_product, product_row_to_product, search_products,
    update_product, ProductRow,
};
pub use reviews::{delete_review, insert_review, list_reviews_for_product, review_row_to_review, ReviewRow};
pub use sqlx::PgPool;
pub use users::{get_user_by_username, insert_user, list_recent_signups, UserRow};
