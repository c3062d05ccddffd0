use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::menu::handlers;
use crate::features::menu::services::MenuService;

/// Create routes for the public menu
pub fn routes(service: Arc<MenuService>) -> Router {
    Router::new()
        .route("/api/menu", get(handlers::get_menu))
        .with_state(service)
}
