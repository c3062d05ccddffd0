use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::categories::models::Category;
use crate::features::products::models::Product;

/// Product as shown to guests
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuProductDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "12.50")]
    pub price: Decimal,
    pub image: Option<String>,
    pub display_order: i32,
}

impl From<Product> for MenuProductDto {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            image: p.image,
            display_order: p.display_order,
        }
    }
}

/// Category with its products, both in display order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuCategoryDto {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub display_order: i32,
    pub products: Vec<MenuProductDto>,
}

impl MenuCategoryDto {
    pub fn new(category: Category, products: Vec<MenuProductDto>) -> Self {
        Self {
            id: category.id,
            name: category.name,
            icon: category.icon,
            display_order: category.display_order,
            products,
        }
    }
}
