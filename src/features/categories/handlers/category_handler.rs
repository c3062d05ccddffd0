use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::categories::dtos::{
    CategoryResponseDto, CreateCategoryDto, ReorderCategoryItemDto, RestoreCategoryItemDto,
    UpdateCategoryDto,
};
use crate::features::categories::services::CategoryService;
use crate::shared::types::{ApiResponse, BulkIdsDto, BulkResultDto};
use crate::shared::validation::{ensure_batch_size, ensure_unique, validate_batch};

/// List live categories in display order
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "List of categories", body = ApiResponse<Vec<CategoryResponseDto>>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(service): State<Arc<CategoryService>>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let categories = service.list().await?;
    Ok(Json(ApiResponse::list(categories)))
}

/// List soft-deleted categories
#[utoipa::path(
    get,
    path = "/api/categories/trash",
    responses(
        (status = 200, description = "Deleted categories", body = ApiResponse<Vec<CategoryResponseDto>>),
    ),
    tag = "categories"
)]
pub async fn list_deleted_categories(
    State(service): State<Arc<CategoryService>>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let categories = service.list_deleted().await?;
    Ok(Json(ApiResponse::list(categories)))
}

/// Get category by ID
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Create a category
///
/// Appended after the last category unless `display_order` is given.
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryDto,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error")
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(service): State<Arc<CategoryService>>,
    AppJson(dto): AppJson<CreateCategoryDto>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let category = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(category), None, None)),
    ))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = UpdateCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let category = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Reorder categories
///
/// Order values are applied as submitted and must number the live
/// categories contiguously from 0.
#[utoipa::path(
    put,
    path = "/api/categories/reorder",
    request_body = Vec<ReorderCategoryItemDto>,
    responses(
        (status = 200, description = "Categories reordered", body = ApiResponse<Vec<CategoryResponseDto>>),
        (status = 400, description = "Invalid or non-contiguous order"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn reorder_categories(
    State(service): State<Arc<CategoryService>>,
    AppJson(items): AppJson<Vec<ReorderCategoryItemDto>>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    validate_batch(&items)?;
    ensure_unique(items.iter().map(|i| i.id))?;

    let categories = service.reorder(items).await?;
    Ok(Json(ApiResponse::list(categories)))
}

/// Soft delete a category
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(None, None, None)))
}

/// Soft delete several categories
#[utoipa::path(
    post,
    path = "/api/categories/bulk-delete",
    request_body = BulkIdsDto,
    responses(
        (status = 200, description = "Categories deleted", body = ApiResponse<BulkResultDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn bulk_delete_categories(
    State(service): State<Arc<CategoryService>>,
    AppJson(dto): AppJson<BulkIdsDto>,
) -> Result<Json<ApiResponse<BulkResultDto>>> {
    ensure_batch_size(dto.ids.len())?;
    ensure_unique(dto.ids.iter())?;

    let result = service.bulk_delete(&dto.ids).await?;
    Ok(Json(ApiResponse::success(Some(result), None, None)))
}

/// Restore categories from the trash
///
/// Categories restored by `id` keep it; items without a known `id` are
/// re-created under a new one.
#[utoipa::path(
    post,
    path = "/api/categories/restore",
    request_body = Vec<RestoreCategoryItemDto>,
    responses(
        (status = 200, description = "Categories restored", body = ApiResponse<Vec<CategoryResponseDto>>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Category is not deleted")
    ),
    tag = "categories"
)]
pub async fn restore_categories(
    State(service): State<Arc<CategoryService>>,
    AppJson(items): AppJson<Vec<RestoreCategoryItemDto>>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    validate_batch(&items)?;
    ensure_unique(items.iter().filter_map(|i| i.id))?;
    if let Some(index) = items.iter().position(|i| i.id.is_none() && i.name.is_none()) {
        return Err(AppError::Validation(format!(
            "item {}: name is required when id is omitted",
            index
        )));
    }

    let categories = service.restore(items).await?;
    Ok(Json(ApiResponse::list(categories)))
}

/// Permanently delete categories
#[utoipa::path(
    post,
    path = "/api/categories/permanent-delete",
    request_body = BulkIdsDto,
    responses(
        (status = 200, description = "Categories purged", body = ApiResponse<BulkResultDto>),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still holds live products")
    ),
    tag = "categories"
)]
pub async fn permanent_delete_categories(
    State(service): State<Arc<CategoryService>>,
    AppJson(dto): AppJson<BulkIdsDto>,
) -> Result<Json<ApiResponse<BulkResultDto>>> {
    ensure_batch_size(dto.ids.len())?;
    ensure_unique(dto.ids.iter())?;

    let result = service.permanent_delete(&dto.ids).await?;
    Ok(Json(ApiResponse::success(Some(result), None, None)))
}
