use std::collections::HashSet;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::categories::dtos::{
    CategoryResponseDto, CreateCategoryDto, ReorderCategoryItemDto, RestoreCategoryItemDto,
    UpdateCategoryDto,
};
use crate::features::categories::models::{Category, CATEGORY_COLUMNS};
use crate::features::ordering::{coordinator, plan, Collection, OrderedRecord, RestoreHint, Scope};
use crate::shared::types::BulkResultDto;

/// Service for category operations
pub struct CategoryService {
    pool: PgPool,
}

impl CategoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List live categories in display order
    pub async fn list(&self) -> Result<Vec<CategoryResponseDto>> {
        let query = format!(
            "SELECT {} FROM categories WHERE deleted_at IS NULL ORDER BY display_order, id",
            CATEGORY_COLUMNS
        );
        let categories = sqlx::query_as::<_, Category>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list categories: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(categories.into_iter().map(|c| c.into()).collect())
    }

    /// List soft-deleted categories, most recently deleted first
    pub async fn list_deleted(&self) -> Result<Vec<CategoryResponseDto>> {
        let query = format!(
            "SELECT {} FROM categories WHERE deleted_at IS NOT NULL ORDER BY deleted_at DESC, display_order",
            CATEGORY_COLUMNS
        );
        let categories = sqlx::query_as::<_, Category>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list deleted categories: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(categories.into_iter().map(|c| c.into()).collect())
    }

    /// Get category by ID (live or deleted)
    pub async fn get_by_id(&self, id: Uuid) -> Result<CategoryResponseDto> {
        let query = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get category: {:?}", e);
                AppError::Database(e)
            })?;

        category
            .map(|c| c.into())
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    /// Create a category at the end of the sequence or at an explicit position
    pub async fn create(&self, dto: CreateCategoryDto) -> Result<CategoryResponseDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let scope = Scope::Categories;
        coordinator::lock_scope(&mut tx, scope).await?;

        let id = Uuid::now_v7();
        let slot = coordinator::append_slot(&mut tx, scope).await?;
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, icon, display_order, is_active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&dto.name)
        .bind(&dto.icon)
        .bind(slot)
        .bind(dto.is_active.unwrap_or(true))
        .execute(&mut *tx)
        .await
        .map_err(handle_db_error)?;

        coordinator::place_record(
            &mut tx,
            scope,
            OrderedRecord::new(id, slot),
            dto.display_order,
        )
        .await?;

        let category = fetch_one(&mut tx, id).await?;
        tx.commit().await.map_err(handle_db_error)?;

        tracing::info!(
            "Category created: id={}, display_order={}",
            category.id,
            category.display_order
        );
        Ok(category.into())
    }

    /// Update name, icon or active flag of a live category
    pub async fn update(&self, id: Uuid, dto: UpdateCategoryDto) -> Result<CategoryResponseDto> {
        let query = format!(
            r#"
            UPDATE categories
            SET name = COALESCE($1, name),
                icon = COALESCE($2, icon),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $4 AND deleted_at IS NULL
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(dto.name)
            .bind(dto.icon)
            .bind(dto.is_active)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(handle_db_error)?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))?;

        Ok(category.into())
    }

    /// Apply a submitted order verbatim.
    ///
    /// The submission must leave the live categories numbered contiguously
    /// from 0; otherwise nothing is written.
    pub async fn reorder(
        &self,
        items: Vec<ReorderCategoryItemDto>,
    ) -> Result<Vec<CategoryResponseDto>> {
        let requested: Vec<(Uuid, i32)> = items.iter().map(|i| (i.id, i.display_order)).collect();

        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let scope = Scope::Categories;
        coordinator::lock_scope(&mut tx, scope).await?;

        let live = coordinator::load_scope(&mut tx, scope).await?;
        let plan = plan::plan_verbatim(scope, live, &requested)?;
        coordinator::apply_plan(&mut tx, &plan).await?;

        tx.commit().await.map_err(handle_db_error)?;

        self.list().await
    }

    /// Soft delete one category and close the gap it leaves
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        coordinator::soft_delete(&mut tx, Collection::Categories, &[id]).await?;
        tx.commit().await.map_err(handle_db_error)?;
        Ok(())
    }

    /// Soft delete many categories with a single reindex
    pub async fn bulk_delete(&self, ids: &[Uuid]) -> Result<BulkResultDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let outcome = coordinator::soft_delete(&mut tx, Collection::Categories, ids).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(BulkResultDto {
            affected: outcome.affected,
            reindexed_scopes: outcome.plans.len(),
        })
    }

    /// Bring categories back from the trash.
    ///
    /// Items naming a deleted category are reactivated and keep their id;
    /// the rest are re-created with a new id. Every item lands by its hint
    /// order and the whole sequence is rebuilt once.
    pub async fn restore(
        &self,
        items: Vec<RestoreCategoryItemDto>,
    ) -> Result<Vec<CategoryResponseDto>> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let scope = Scope::Categories;
        coordinator::lock_scope(&mut tx, scope).await?;

        let requested_ids: Vec<Uuid> = items.iter().filter_map(|i| i.id).collect();
        let existing = existing_states(&mut tx, &requested_ids).await?;

        let mut hints = Vec::new();
        let mut recreate = Vec::new();
        for item in items {
            match item.id.and_then(|id| existing.iter().find(|(e, _)| *e == id)) {
                Some((id, true)) => hints.push(RestoreHint {
                    id: *id,
                    display_order: item.display_order,
                    category_id: None,
                }),
                Some((id, false)) => {
                    return Err(AppError::Conflict(format!(
                        "Category {} is not deleted",
                        id
                    )))
                }
                None => recreate.push(item),
            }
        }

        let mut restored_ids: Vec<Uuid> = hints.iter().map(|h| h.id).collect();
        let slot = coordinator::append_slot(&mut tx, scope).await?;
        for (offset, item) in recreate.into_iter().enumerate() {
            let name = item.name.ok_or_else(|| {
                AppError::Validation("name is required to re-create a category".to_string())
            })?;
            let id = Uuid::now_v7();
            sqlx::query(
                r#"
                INSERT INTO categories (id, name, icon, display_order)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(id)
            .bind(name)
            .bind(item.icon)
            .bind(item.display_order.unwrap_or(slot + offset as i32))
            .execute(&mut *tx)
            .await
            .map_err(handle_db_error)?;

            if let Some(original) = item.id {
                tracing::info!("Category {} re-created as {}", original, id);
            }
            restored_ids.push(id);
        }

        // One reindex pass over the whole scope either way
        if hints.is_empty() {
            coordinator::reindex_scope(&mut tx, scope).await?;
        } else {
            coordinator::reactivate(&mut tx, Collection::Categories, &hints).await?;
        }

        let categories = fetch_many(&mut tx, &restored_ids).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(categories.into_iter().map(|c| c.into()).collect())
    }

    /// Irreversibly remove categories and their trashed products.
    ///
    /// Refused while a category still holds live products.
    pub async fn permanent_delete(&self, ids: &[Uuid]) -> Result<BulkResultDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;

        let live_products: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE category_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_one(&mut *tx)
        .await
        .map_err(handle_db_error)?;
        if live_products > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot permanently delete categories that still hold {} live products",
                live_products
            )));
        }

        let outcome = coordinator::purge(&mut tx, Collection::Categories, ids).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(BulkResultDto {
            affected: outcome.affected,
            reindexed_scopes: outcome.plans.len(),
        })
    }
}

async fn fetch_one(conn: &mut PgConnection, id: Uuid) -> Result<Category> {
    let query = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);
    sqlx::query_as::<_, Category>(&query)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(handle_db_error)
}

async fn fetch_many(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<Category>> {
    let query = format!(
        "SELECT {} FROM categories WHERE id = ANY($1) ORDER BY display_order, id",
        CATEGORY_COLUMNS
    );
    sqlx::query_as::<_, Category>(&query)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(handle_db_error)
}

/// `(id, is_deleted)` for the ids that exist
async fn existing_states(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<(Uuid, bool)>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let unique: Vec<Uuid> = ids
        .iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    sqlx::query_as::<_, (Uuid, bool)>(
        "SELECT id, deleted_at IS NOT NULL FROM categories WHERE id = ANY($1)",
    )
    .bind(unique)
    .fetch_all(&mut *conn)
    .await
    .map_err(handle_db_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create(service: &CategoryService, name: &str) -> Uuid {
        service
            .create(CreateCategoryDto {
                name: name.to_string(),
                icon: None,
                display_order: None,
                is_active: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn names(service: &CategoryService) -> Vec<(String, i32)> {
        service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.name, c.display_order))
            .collect()
    }

    fn recreate(name: &str, id: Option<Uuid>) -> RestoreCategoryItemDto {
        RestoreCategoryItemDto {
            id,
            name: Some(name.to_string()),
            icon: None,
            display_order: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_restore_recreates_purged_category(pool: PgPool) {
        let service = CategoryService::new(pool);
        create(&service, "Coffee").await;
        let gone = create(&service, "Desserts").await;
        service.permanent_delete(&[gone]).await.unwrap();

        let restored = service
            .restore(vec![recreate("Desserts", Some(gone))])
            .await
            .unwrap();

        assert_eq!(restored.len(), 1);
        assert_ne!(restored[0].id, gone);
        assert_eq!(
            names(&service).await,
            vec![("Coffee".to_string(), 0), ("Desserts".to_string(), 1)]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_restore_mixes_reactivation_and_recreation(pool: PgPool) {
        let service = CategoryService::new(pool);
        create(&service, "Coffee").await;
        let tea = create(&service, "Tea").await;
        create(&service, "Juice").await;
        service.delete(tea).await.unwrap();

        let restored = service
            .restore(vec![
                RestoreCategoryItemDto {
                    id: Some(tea),
                    name: None,
                    icon: None,
                    display_order: None,
                },
                recreate("Snacks", None),
            ])
            .await
            .unwrap();

        assert_eq!(restored.len(), 2);
        assert!(restored.iter().any(|c| c.id == tea));
        assert_eq!(
            names(&service).await,
            vec![
                ("Coffee".to_string(), 0),
                ("Tea".to_string(), 1),
                ("Juice".to_string(), 2),
                ("Snacks".to_string(), 3)
            ]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_restore_inactive_category_keeps_sequence(pool: PgPool) {
        let service = CategoryService::new(pool);
        create(&service, "Coffee").await;
        let hidden = service
            .create(CreateCategoryDto {
                name: "Seasonal".to_string(),
                icon: None,
                display_order: None,
                is_active: Some(false),
            })
            .await
            .unwrap()
            .id;
        create(&service, "Juice").await;

        service.delete(hidden).await.unwrap();
        service
            .restore(vec![RestoreCategoryItemDto {
                id: Some(hidden),
                name: None,
                icon: None,
                display_order: None,
            }])
            .await
            .unwrap();

        assert_eq!(
            names(&service).await,
            vec![
                ("Coffee".to_string(), 0),
                ("Seasonal".to_string(), 1),
                ("Juice".to_string(), 2)
            ]
        );
    }
}
