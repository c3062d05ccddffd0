use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::features::menu::dtos::MenuCategoryDto;
use crate::features::menu::services::MenuService;
use crate::shared::types::ApiResponse;

/// Public menu: active categories with their active products
#[utoipa::path(
    get,
    path = "/api/menu",
    responses(
        (status = 200, description = "Menu", body = ApiResponse<Vec<MenuCategoryDto>>),
    ),
    tag = "menu"
)]
pub async fn get_menu(
    State(service): State<Arc<MenuService>>,
) -> Result<Json<ApiResponse<Vec<MenuCategoryDto>>>> {
    let menu = service.menu().await?;
    Ok(Json(ApiResponse::list(menu)))
}
