use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::tables::handlers;
use crate::features::tables::services::TableService;

/// Create routes for the tables feature
pub fn routes(service: Arc<TableService>) -> Router {
    Router::new()
        .route(
            "/api/tables",
            get(handlers::list_tables).post(handlers::create_table),
        )
        .route("/api/tables/trash", get(handlers::list_deleted_tables))
        .route("/api/tables/reorder", post(handlers::reorder_tables))
        .route("/api/tables/bulk-delete", post(handlers::bulk_delete_tables))
        .route("/api/tables/restore", post(handlers::restore_tables))
        .route(
            "/api/tables/permanent-delete",
            post(handlers::permanent_delete_tables),
        )
        .route(
            "/api/tables/{id}",
            get(handlers::get_table)
                .put(handlers::update_table)
                .delete(handlers::delete_table),
        )
        .with_state(service)
}
