use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::features::products::handlers;
use crate::features::products::services::ProductService;

/// Create routes for the products feature
pub fn routes(service: Arc<ProductService>) -> Router {
    Router::new()
        .route(
            "/api/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/api/products/trash", get(handlers::list_deleted_products))
        .route("/api/products/reorder", put(handlers::reorder_products))
        .route(
            "/api/products/bulk-delete",
            post(handlers::bulk_delete_products),
        )
        .route("/api/products/restore", post(handlers::restore_products))
        .route(
            "/api/products/permanent-delete",
            post(handlers::permanent_delete_products),
        )
        .route(
            "/api/products/{id}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .with_state(service)
}
