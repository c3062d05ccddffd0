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
use crate::features::tables::dtos::{
    CreateTableDto, RestoreTableItemDto, TableResponseDto, UpdateTableDto,
};
use crate::features::tables::services::TableService;
use crate::shared::types::{ApiResponse, BulkIdsDto, BulkResultDto};
use crate::shared::validation::{ensure_batch_size, ensure_unique, validate_batch};

/// List live tables by number
#[utoipa::path(
    get,
    path = "/api/tables",
    responses(
        (status = 200, description = "List of tables", body = ApiResponse<Vec<TableResponseDto>>),
    ),
    tag = "tables"
)]
pub async fn list_tables(
    State(service): State<Arc<TableService>>,
) -> Result<Json<ApiResponse<Vec<TableResponseDto>>>> {
    let tables = service.list().await?;
    Ok(Json(ApiResponse::list(tables)))
}

#[utoipa::path(
    get,
    path = "/api/tables/trash",
    responses(
        (status = 200, description = "Deleted tables", body = ApiResponse<Vec<TableResponseDto>>),
    ),
    tag = "tables"
)]
pub async fn list_deleted_tables(
    State(service): State<Arc<TableService>>,
) -> Result<Json<ApiResponse<Vec<TableResponseDto>>>> {
    let tables = service.list_deleted().await?;
    Ok(Json(ApiResponse::list(tables)))
}

#[utoipa::path(
    get,
    path = "/api/tables/{id}",
    params(
        ("id" = Uuid, Path, description = "Table ID")
    ),
    responses(
        (status = 200, description = "Table found", body = ApiResponse<TableResponseDto>),
        (status = 404, description = "Table not found")
    ),
    tag = "tables"
)]
pub async fn get_table(
    State(service): State<Arc<TableService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TableResponseDto>>> {
    let table = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(table), None, None)))
}

/// Create a table
#[utoipa::path(
    post,
    path = "/api/tables",
    request_body = CreateTableDto,
    responses(
        (status = 201, description = "Table created", body = ApiResponse<TableResponseDto>),
        (status = 400, description = "Validation error")
    ),
    tag = "tables"
)]
pub async fn create_table(
    State(service): State<Arc<TableService>>,
    AppJson(dto): AppJson<CreateTableDto>,
) -> Result<(StatusCode, Json<ApiResponse<TableResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let table = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(table), None, None)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/tables/{id}",
    params(
        ("id" = Uuid, Path, description = "Table ID")
    ),
    request_body = UpdateTableDto,
    responses(
        (status = 200, description = "Table updated", body = ApiResponse<TableResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Table not found")
    ),
    tag = "tables"
)]
pub async fn update_table(
    State(service): State<Arc<TableService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateTableDto>,
) -> Result<Json<ApiResponse<TableResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let table = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(table), None, None)))
}

/// Renumber all live tables from 1
#[utoipa::path(
    post,
    path = "/api/tables/reorder",
    responses(
        (status = 200, description = "Tables renumbered", body = ApiResponse<Vec<TableResponseDto>>),
    ),
    tag = "tables"
)]
pub async fn reorder_tables(
    State(service): State<Arc<TableService>>,
) -> Result<Json<ApiResponse<Vec<TableResponseDto>>>> {
    let tables = service.reindex().await?;
    Ok(Json(ApiResponse::list(tables)))
}

#[utoipa::path(
    delete,
    path = "/api/tables/{id}",
    params(
        ("id" = Uuid, Path, description = "Table ID")
    ),
    responses(
        (status = 200, description = "Table deleted"),
        (status = 404, description = "Table not found")
    ),
    tag = "tables"
)]
pub async fn delete_table(
    State(service): State<Arc<TableService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(None, None, None)))
}

#[utoipa::path(
    post,
    path = "/api/tables/bulk-delete",
    request_body = BulkIdsDto,
    responses(
        (status = 200, description = "Tables deleted", body = ApiResponse<BulkResultDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Table not found")
    ),
    tag = "tables"
)]
pub async fn bulk_delete_tables(
    State(service): State<Arc<TableService>>,
    AppJson(dto): AppJson<BulkIdsDto>,
) -> Result<Json<ApiResponse<BulkResultDto>>> {
    ensure_batch_size(dto.ids.len())?;
    ensure_unique(dto.ids.iter())?;

    let result = service.bulk_delete(&dto.ids).await?;
    Ok(Json(ApiResponse::success(Some(result), None, None)))
}

#[utoipa::path(
    post,
    path = "/api/tables/restore",
    request_body = Vec<RestoreTableItemDto>,
    responses(
        (status = 200, description = "Tables restored", body = ApiResponse<Vec<TableResponseDto>>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "No deleted table with that id")
    ),
    tag = "tables"
)]
pub async fn restore_tables(
    State(service): State<Arc<TableService>>,
    AppJson(items): AppJson<Vec<RestoreTableItemDto>>,
) -> Result<Json<ApiResponse<Vec<TableResponseDto>>>> {
    validate_batch(&items)?;
    ensure_unique(items.iter().map(|i| i.id))?;

    let tables = service.restore(items).await?;
    Ok(Json(ApiResponse::list(tables)))
}

#[utoipa::path(
    post,
    path = "/api/tables/permanent-delete",
    request_body = BulkIdsDto,
    responses(
        (status = 200, description = "Tables purged", body = ApiResponse<BulkResultDto>),
        (status = 404, description = "Table not found")
    ),
    tag = "tables"
)]
pub async fn permanent_delete_tables(
    State(service): State<Arc<TableService>>,
    AppJson(dto): AppJson<BulkIdsDto>,
) -> Result<Json<ApiResponse<BulkResultDto>>> {
    ensure_batch_size(dto.ids.len())?;
    ensure_unique(dto.ids.iter())?;

    let result = service.permanent_delete(&dto.ids).await?;
    Ok(Json(ApiResponse::success(Some(result), None, None)))
}
