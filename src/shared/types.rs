use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub meta: Option<Meta>,
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Meta {
    pub total: i64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            data,
            message,
            meta,
            errors: None,
        }
    }

    pub fn error(message: Option<String>, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message,
            meta: None,
            errors,
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// Successful list response with `meta.total` set to the list length
    pub fn list(items: Vec<T>) -> Self {
        let total = items.len() as i64;
        Self::success(Some(items), None, Some(Meta { total }))
    }
}

// =============================================================================
// BULK OPERATIONS
// =============================================================================

/// Request body shared by bulk-delete and permanent-delete endpoints
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkIdsDto {
    pub ids: Vec<Uuid>,
}

/// Outcome of a bulk operation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkResultDto {
    /// Records deleted, restored or purged
    pub affected: u64,
    /// Scopes whose order sequence was rebuilt
    pub reindexed_scopes: usize,
}
