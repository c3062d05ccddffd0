use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::tables::models::DiningTable;

/// Response DTO for a dining table
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableResponseDto {
    pub id: Uuid,
    pub name: String,
    /// Table number, counted from 1
    pub display_order: i32,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<DiningTable> for TableResponseDto {
    fn from(t: DiningTable) -> Self {
        Self {
            id: t.id,
            name: t.name,
            display_order: t.display_order,
            is_active: t.is_active,
            deleted_at: t.deleted_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTableDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// Insert at this table number; appended when omitted
    #[validate(range(min = 1))]
    pub display_order: Option<i32>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTableDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    /// Move the table to this number
    #[validate(range(min = 1))]
    pub display_order: Option<i32>,

    pub is_active: Option<bool>,
}

/// One table to bring back from the trash
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RestoreTableItemDto {
    pub id: Uuid,

    /// Placement hint; defaults to the number held when it was deleted
    #[validate(range(min = 1))]
    pub display_order: Option<i32>,
}
