use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::features::products::models::Product;

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        return Err(ValidationError::new("price_negative"));
    }
    Ok(())
}

/// Response DTO for product
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponseDto {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "12.50")]
    pub price: Decimal,
    pub image: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponseDto {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            category_id: p.category_id,
            name: p.name,
            description: p.description,
            price: p.price,
            image: p.image,
            display_order: p.display_order,
            is_active: p.is_active,
            deleted_at: p.deleted_at,
            updated_at: p.updated_at,
        }
    }
}

/// Query params for listing products
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// Only products of this category
    pub category_id: Option<Uuid>,
}

/// Create request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductDto {
    pub category_id: Uuid,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = String, example = "12.50")]
    pub price: Decimal,

    #[validate(length(max = 1000))]
    pub image: Option<String>,

    /// Insert at this position in the category; appended when omitted
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,

    pub is_active: Option<bool>,
}

/// Update request.
///
/// A `category_id` different from the current one moves the product; it is
/// appended to the new category unless `display_order` gives a position.
/// Without a move, `display_order` repositions it inside its category.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = Option<String>, example = "12.50")]
    pub price: Option<Decimal>,

    #[validate(length(max = 1000))]
    pub image: Option<String>,

    pub is_active: Option<bool>,

    pub category_id: Option<Uuid>,

    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
}

/// One entry of a reorder submission
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReorderProductItemDto {
    pub id: Uuid,

    /// Category the product should end up in
    pub category_id: Uuid,

    #[validate(range(min = 0))]
    pub display_order: i32,
}

/// One product to bring back from the trash
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RestoreProductItemDto {
    pub id: Uuid,

    /// Placement hint; defaults to the order held when it was deleted
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,

    /// Restore into another live category
    pub category_id: Option<Uuid>,
}
