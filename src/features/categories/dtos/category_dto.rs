use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::Category;

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            icon: c.icon,
            display_order: c.display_order,
            is_active: c.is_active,
            deleted_at: c.deleted_at,
            updated_at: c.updated_at,
        }
    }
}

/// Create request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryDto {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(max = 500))]
    pub icon: Option<String>,

    /// Insert at this position; appended when omitted
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,

    pub is_active: Option<bool>,
}

/// Update request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub icon: Option<String>,

    pub is_active: Option<bool>,
}

/// One entry of a full reorder submission
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReorderCategoryItemDto {
    pub id: Uuid,

    #[validate(range(min = 0))]
    pub display_order: i32,
}

/// One category to bring back from the trash.
///
/// With the `id` of a deleted category the record is reactivated in place.
/// Without it (or when that id no longer exists) the category is re-created
/// under a new id from `name` and `icon`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RestoreCategoryItemDto {
    pub id: Option<Uuid>,

    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub icon: Option<String>,

    /// Original order, used as a placement hint
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_name() {
        let dto: CreateCategoryDto = serde_json::from_value(serde_json::json!({
            "name": ""
        }))
        .unwrap();

        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_reorder_rejects_negative_order() {
        let dto: ReorderCategoryItemDto = serde_json::from_value(serde_json::json!({
            "id": Uuid::now_v7(),
            "display_order": -1
        }))
        .unwrap();

        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_restore_item_accepts_missing_id() {
        let dto: RestoreCategoryItemDto = serde_json::from_value(serde_json::json!({
            "name": "Desserts",
            "icon": "cake",
            "display_order": 3
        }))
        .unwrap();

        assert!(dto.validate().is_ok());
        assert!(dto.id.is_none());
    }
}
