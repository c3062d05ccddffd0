use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, CATEGORY_COLUMNS};
use crate::features::menu::dtos::{MenuCategoryDto, MenuProductDto};
use crate::features::products::models::{Product, PRODUCT_COLUMNS};

/// Read model of the guest-facing menu
pub struct MenuService {
    pool: PgPool,
}

impl MenuService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Live, active categories with their live, active products
    pub async fn menu(&self) -> Result<Vec<MenuCategoryDto>> {
        let query = format!(
            r#"
            SELECT {} FROM categories
            WHERE deleted_at IS NULL AND is_active = TRUE
            ORDER BY display_order, id
            "#,
            CATEGORY_COLUMNS
        );
        let categories = sqlx::query_as::<_, Category>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load menu categories: {:?}", e);
                AppError::Database(e)
            })?;

        let category_ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
        let query = format!(
            r#"
            SELECT {} FROM products
            WHERE category_id = ANY($1) AND deleted_at IS NULL AND is_active = TRUE
            ORDER BY display_order, id
            "#,
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&query)
            .bind(&category_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load menu products: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(assemble(categories, products))
    }
}

fn assemble(categories: Vec<Category>, products: Vec<Product>) -> Vec<MenuCategoryDto> {
    let mut by_category: HashMap<Uuid, Vec<MenuProductDto>> = HashMap::new();
    for product in products {
        by_category
            .entry(product.category_id)
            .or_default()
            .push(product.into());
    }

    categories
        .into_iter()
        .map(|category| {
            let products = by_category.remove(&category.id).unwrap_or_default();
            MenuCategoryDto::new(category, products)
        })
        .collect()
}
