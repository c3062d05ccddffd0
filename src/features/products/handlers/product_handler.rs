use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::products::dtos::{
    CreateProductDto, ProductListQuery, ProductResponseDto, ReorderProductItemDto,
    RestoreProductItemDto, UpdateProductDto,
};
use crate::features::products::services::ProductService;
use crate::shared::types::{ApiResponse, BulkIdsDto, BulkResultDto};
use crate::shared::validation::{ensure_batch_size, ensure_unique, validate_batch};

/// List live products
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "List of products", body = ApiResponse<Vec<ProductResponseDto>>),
    ),
    tag = "products"
)]
pub async fn list_products(
    State(service): State<Arc<ProductService>>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ApiResponse<Vec<ProductResponseDto>>>> {
    let products = service.list(&query).await?;
    Ok(Json(ApiResponse::list(products)))
}

/// List soft-deleted products
#[utoipa::path(
    get,
    path = "/api/products/trash",
    responses(
        (status = 200, description = "Deleted products", body = ApiResponse<Vec<ProductResponseDto>>),
    ),
    tag = "products"
)]
pub async fn list_deleted_products(
    State(service): State<Arc<ProductService>>,
) -> Result<Json<ApiResponse<Vec<ProductResponseDto>>>> {
    let products = service.list_deleted().await?;
    Ok(Json(ApiResponse::list(products)))
}

/// Get product by ID
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductResponseDto>),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn get_product(
    State(service): State<Arc<ProductService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductResponseDto>>> {
    let product = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(product), None, None)))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductDto,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Category not found")
    ),
    tag = "products"
)]
pub async fn create_product(
    State(service): State<Arc<ProductService>>,
    AppJson(dto): AppJson<CreateProductDto>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(product), None, None)),
    ))
}

/// Update a product, optionally moving it to another category
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductDto,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Product or category not found"),
        (status = 409, description = "Concurrent modification")
    ),
    tag = "products"
)]
pub async fn update_product(
    State(service): State<Arc<ProductService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateProductDto>,
) -> Result<Json<ApiResponse<ProductResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(product), None, None)))
}

/// Reorder products
///
/// Every category named in the batch is renumbered from 0 following the
/// submitted order. Returns the resulting order of those categories.
#[utoipa::path(
    put,
    path = "/api/products/reorder",
    request_body = Vec<ReorderProductItemDto>,
    responses(
        (status = 200, description = "Products reordered", body = ApiResponse<Vec<ProductResponseDto>>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Product or category not found")
    ),
    tag = "products"
)]
pub async fn reorder_products(
    State(service): State<Arc<ProductService>>,
    AppJson(items): AppJson<Vec<ReorderProductItemDto>>,
) -> Result<Json<ApiResponse<Vec<ProductResponseDto>>>> {
    validate_batch(&items)?;
    ensure_unique(items.iter().map(|i| i.id))?;

    let products = service.reorder(items).await?;
    Ok(Json(ApiResponse::list(products)))
}

/// Soft delete a product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(service): State<Arc<ProductService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(None, None, None)))
}

/// Soft delete several products
#[utoipa::path(
    post,
    path = "/api/products/bulk-delete",
    request_body = BulkIdsDto,
    responses(
        (status = 200, description = "Products deleted", body = ApiResponse<BulkResultDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn bulk_delete_products(
    State(service): State<Arc<ProductService>>,
    AppJson(dto): AppJson<BulkIdsDto>,
) -> Result<Json<ApiResponse<BulkResultDto>>> {
    ensure_batch_size(dto.ids.len())?;
    ensure_unique(dto.ids.iter())?;

    let result = service.bulk_delete(&dto.ids).await?;
    Ok(Json(ApiResponse::success(Some(result), None, None)))
}

/// Restore products from the trash
#[utoipa::path(
    post,
    path = "/api/products/restore",
    request_body = Vec<RestoreProductItemDto>,
    responses(
        (status = 200, description = "Products restored", body = ApiResponse<Vec<ProductResponseDto>>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "No deleted product or no live category")
    ),
    tag = "products"
)]
pub async fn restore_products(
    State(service): State<Arc<ProductService>>,
    AppJson(items): AppJson<Vec<RestoreProductItemDto>>,
) -> Result<Json<ApiResponse<Vec<ProductResponseDto>>>> {
    validate_batch(&items)?;
    ensure_unique(items.iter().map(|i| i.id))?;

    let products = service.restore(items).await?;
    Ok(Json(ApiResponse::list(products)))
}

/// Permanently delete products
#[utoipa::path(
    post,
    path = "/api/products/permanent-delete",
    request_body = BulkIdsDto,
    responses(
        (status = 200, description = "Products purged", body = ApiResponse<BulkResultDto>),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn permanent_delete_products(
    State(service): State<Arc<ProductService>>,
    AppJson(dto): AppJson<BulkIdsDto>,
) -> Result<Json<ApiResponse<BulkResultDto>>> {
    ensure_batch_size(dto.ids.len())?;
    ensure_unique(dto.ids.iter())?;

    let result = service.permanent_delete(&dto.ids).await?;
    Ok(Json(ApiResponse::success(Some(result), None, None)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::products::routes::routes;
    use crate::shared::test_helpers::{lazy_pool, test_server};
    use serde_json::json;

    fn server() -> axum_test::TestServer {
        test_server(routes(Arc::new(ProductService::new(lazy_pool()))))
    }

    #[tokio::test]
    async fn test_create_rejects_negative_price() {
        let response = server()
            .post("/api/products")
            .json(&json!({
                "category_id": Uuid::now_v7(),
                "name": "Espresso",
                "price": "-2.00"
            }))
            .await;

        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_category() {
        let response = server()
            .post("/api/products")
            .json(&json!({ "name": "Espresso", "price": "2.00" }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_reorder_rejects_negative_order() {
        let response = server()
            .put("/api/products/reorder")
            .json(&json!([
                { "id": Uuid::now_v7(), "category_id": Uuid::now_v7(), "display_order": -1 }
            ]))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_reorder_rejects_duplicate_ids() {
        let id = Uuid::now_v7();
        let category_id = Uuid::now_v7();
        let response = server()
            .put("/api/products/reorder")
            .json(&json!([
                { "id": id, "category_id": category_id, "display_order": 0 },
                { "id": id, "category_id": category_id, "display_order": 1 }
            ]))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_restore_rejects_duplicate_ids() {
        let id = Uuid::now_v7();
        let response = server()
            .post("/api/products/restore")
            .json(&json!([{ "id": id }, { "id": id, "display_order": 3 }]))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_permanent_delete_rejects_empty_ids() {
        let response = server()
            .post("/api/products/permanent-delete")
            .json(&json!({ "ids": [] }))
            .await;

        response.assert_status_bad_request();
    }
}
