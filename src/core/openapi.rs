use utoipa::{Modify, OpenApi};

use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::menu::{dtos as menu_dtos, handlers as menu_handlers};
use crate::features::products::{dtos as products_dtos, handlers as products_handlers};
use crate::features::tables::{dtos as tables_dtos, handlers as tables_handlers};
use crate::shared::types::{ApiResponse, BulkIdsDto, BulkResultDto, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories
        categories_handlers::list_categories,
        categories_handlers::list_deleted_categories,
        categories_handlers::get_category,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::reorder_categories,
        categories_handlers::delete_category,
        categories_handlers::bulk_delete_categories,
        categories_handlers::restore_categories,
        categories_handlers::permanent_delete_categories,
        // Products
        products_handlers::list_products,
        products_handlers::list_deleted_products,
        products_handlers::get_product,
        products_handlers::create_product,
        products_handlers::update_product,
        products_handlers::reorder_products,
        products_handlers::delete_product,
        products_handlers::bulk_delete_products,
        products_handlers::restore_products,
        products_handlers::permanent_delete_products,
        // Tables
        tables_handlers::list_tables,
        tables_handlers::list_deleted_tables,
        tables_handlers::get_table,
        tables_handlers::create_table,
        tables_handlers::update_table,
        tables_handlers::reorder_tables,
        tables_handlers::delete_table,
        tables_handlers::bulk_delete_tables,
        tables_handlers::restore_tables,
        tables_handlers::permanent_delete_tables,
        // Menu (public)
        menu_handlers::get_menu,
    ),
    components(
        schemas(
            // Shared
            Meta,
            BulkIdsDto,
            BulkResultDto,
            ApiResponse<BulkResultDto>,
            // Categories
            categories_dtos::CategoryResponseDto,
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::ReorderCategoryItemDto,
            categories_dtos::RestoreCategoryItemDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            // Products
            products_dtos::ProductResponseDto,
            products_dtos::CreateProductDto,
            products_dtos::UpdateProductDto,
            products_dtos::ReorderProductItemDto,
            products_dtos::RestoreProductItemDto,
            ApiResponse<products_dtos::ProductResponseDto>,
            ApiResponse<Vec<products_dtos::ProductResponseDto>>,
            // Tables
            tables_dtos::TableResponseDto,
            tables_dtos::CreateTableDto,
            tables_dtos::UpdateTableDto,
            tables_dtos::RestoreTableItemDto,
            ApiResponse<tables_dtos::TableResponseDto>,
            ApiResponse<Vec<tables_dtos::TableResponseDto>>,
            // Menu
            menu_dtos::MenuCategoryDto,
            menu_dtos::MenuProductDto,
            ApiResponse<Vec<menu_dtos::MenuCategoryDto>>,
        )
    ),
    tags(
        (name = "categories", description = "Menu categories, their order and trash"),
        (name = "products", description = "Products ordered per category, with trash"),
        (name = "tables", description = "Dining tables numbered from 1, with trash"),
        (name = "menu", description = "Guest-facing menu (public)"),
    ),
    info(
        title = "QR Menu API",
        version = "0.1.0",
        description = "API documentation for the QR menu backend",
    )
)]
pub struct ApiDoc;

/// Overrides the compiled-in info block with values from configuration
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_feature_is_documented() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/categories/reorder",
            "/api/products/{id}",
            "/api/tables/reorder",
            "/api/menu",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_info_modifier_overrides_title() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Cafe".to_string(),
            version: "2.0.0".to_string(),
            description: "Staging".to_string(),
        }
        .modify(&mut doc);

        assert_eq!(doc.info.title, "Cafe");
        assert_eq!(doc.info.description.as_deref(), Some("Staging"));
    }
}
