use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::features::categories::handlers;
use crate::features::categories::services::CategoryService;

/// Create routes for the categories feature
pub fn routes(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/api/categories/trash", get(handlers::list_deleted_categories))
        .route("/api/categories/reorder", put(handlers::reorder_categories))
        .route(
            "/api/categories/bulk-delete",
            post(handlers::bulk_delete_categories),
        )
        .route("/api/categories/restore", post(handlers::restore_categories))
        .route(
            "/api/categories/permanent-delete",
            post(handlers::permanent_delete_categories),
        )
        .route(
            "/api/categories/{id}",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .with_state(service)
}
