use std::collections::{BTreeMap, BTreeSet};

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::ordering::coordinator::{self, LocatedRecord};
use crate::features::ordering::{plan, Collection, OrderedRecord, RestoreHint, Scope};
use crate::features::products::dtos::{
    CreateProductDto, ProductListQuery, ProductResponseDto, ReorderProductItemDto,
    RestoreProductItemDto, UpdateProductDto,
};
use crate::features::products::models::{Product, PRODUCT_COLUMNS};
use crate::shared::types::BulkResultDto;

/// Service for product operations.
///
/// Product order is scoped per category and only counts products that are
/// both live and active.
pub struct ProductService {
    pool: PgPool,
}

impl ProductService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List live products, grouped by category in display order
    pub async fn list(&self, query: &ProductListQuery) -> Result<Vec<ProductResponseDto>> {
        let products = match query.category_id {
            Some(category_id) => {
                let sql = format!(
                    r#"
                    SELECT {} FROM products
                    WHERE category_id = $1 AND deleted_at IS NULL
                    ORDER BY is_active DESC, display_order, id
                    "#,
                    PRODUCT_COLUMNS
                );
                sqlx::query_as::<_, Product>(&sql)
                    .bind(category_id)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!(
                    r#"
                    SELECT {} FROM products
                    WHERE deleted_at IS NULL
                    ORDER BY category_id, is_active DESC, display_order, id
                    "#,
                    PRODUCT_COLUMNS
                );
                sqlx::query_as::<_, Product>(&sql)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| {
            tracing::error!("Failed to list products: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(products.into_iter().map(|p| p.into()).collect())
    }

    /// List soft-deleted products, most recently deleted first
    pub async fn list_deleted(&self) -> Result<Vec<ProductResponseDto>> {
        let sql = format!(
            "SELECT {} FROM products WHERE deleted_at IS NOT NULL ORDER BY deleted_at DESC, id",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list deleted products: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(products.into_iter().map(|p| p.into()).collect())
    }

    /// Get product by ID (live or deleted)
    pub async fn get_by_id(&self, id: Uuid) -> Result<ProductResponseDto> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get product: {:?}", e);
                AppError::Database(e)
            })?
            .map(|p| p.into())
            .ok_or_else(|| AppError::NotFound(format!("Product with id {} not found", id)))
    }

    /// Create a product at the end of its category or at an explicit position
    pub async fn create(&self, dto: CreateProductDto) -> Result<ProductResponseDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        coordinator::ensure_live_categories(&mut tx, &[dto.category_id]).await?;

        let scope = Scope::Products {
            category_id: dto.category_id,
        };
        coordinator::lock_scope(&mut tx, scope).await?;

        let id = Uuid::now_v7();
        let is_active = dto.is_active.unwrap_or(true);
        let slot = coordinator::append_slot(&mut tx, scope).await?;
        sqlx::query(
            r#"
            INSERT INTO products (id, category_id, name, description, price, image, display_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(dto.category_id)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(dto.price)
        .bind(&dto.image)
        .bind(slot)
        .bind(is_active)
        .execute(&mut *tx)
        .await
        .map_err(handle_db_error)?;

        if is_active {
            coordinator::place_record(
                &mut tx,
                scope,
                OrderedRecord::new(id, slot),
                dto.display_order,
            )
            .await?;
        }

        let product = fetch_one(&mut tx, id).await?;
        tx.commit().await.map_err(handle_db_error)?;

        tracing::info!(
            "Product created: id={}, category_id={}, display_order={}",
            product.id,
            product.category_id,
            product.display_order
        );
        Ok(product.into())
    }

    /// Update a live product.
    ///
    /// Changing `category_id` moves the product: its old category closes the
    /// gap and the new one takes it at the end or at `display_order`.
    /// Toggling `is_active` takes it out of, or back into, its category's
    /// sequence.
    pub async fn update(&self, id: Uuid, dto: UpdateProductDto) -> Result<ProductResponseDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;

        let current = fetch_live(&mut tx, id).await?;
        let target_category = dto.category_id.unwrap_or(current.category_id);
        let moving = target_category != current.category_id;
        if moving {
            coordinator::ensure_live_categories(&mut tx, &[target_category]).await?;
        }

        let old_scope = Scope::Products {
            category_id: current.category_id,
        };
        let new_scope = Scope::Products {
            category_id: target_category,
        };
        coordinator::lock_scopes(&mut tx, &BTreeSet::from([old_scope, new_scope])).await?;

        // Re-read under the scope locks
        let locked_category = current.category_id;
        let current = fetch_live(&mut tx, id).await?;
        if current.category_id != locked_category {
            return Err(AppError::Conflict(format!(
                "Product {} was moved concurrently, please retry",
                id
            )));
        }

        let was_member = current.is_active;
        let will_member = dto.is_active.unwrap_or(current.is_active);
        let entering = will_member && (moving || !was_member);
        let leaving = was_member && (moving || !will_member);

        let display_order = if entering {
            coordinator::append_slot(&mut tx, new_scope).await?
        } else {
            current.display_order
        };

        sqlx::query(
            r#"
            UPDATE products
            SET name = COALESCE($1, name),
                description = COALESCE($2, description),
                price = COALESCE($3, price),
                image = COALESCE($4, image),
                is_active = $5,
                category_id = $6,
                display_order = $7,
                updated_at = NOW()
            WHERE id = $8
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(dto.price)
        .bind(&dto.image)
        .bind(will_member)
        .bind(target_category)
        .bind(display_order)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(handle_db_error)?;

        if leaving {
            coordinator::reindex_scope(&mut tx, old_scope).await?;
        }
        if entering || (will_member && dto.display_order.is_some()) {
            coordinator::place_record(
                &mut tx,
                new_scope,
                OrderedRecord::new(id, display_order),
                dto.display_order,
            )
            .await?;
        }

        let product = fetch_one(&mut tx, id).await?;
        tx.commit().await.map_err(handle_db_error)?;

        if moving {
            tracing::info!(
                "Product {} moved from category {} to {} at display_order={}",
                id,
                current.category_id,
                target_category,
                product.display_order
            );
        }
        Ok(product.into())
    }

    /// Reorder products inside their categories.
    ///
    /// Each category named in the submission is rebuilt contiguously from 0
    /// following the submitted order. An item naming another category than
    /// the product's current one moves the product there; the category it
    /// left is reindexed as well.
    pub async fn reorder(
        &self,
        items: Vec<ReorderProductItemDto>,
    ) -> Result<Vec<ProductResponseDto>> {
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let target_categories: Vec<Uuid> = items.iter().map(|i| i.category_id).collect();

        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        coordinator::ensure_live_categories(&mut tx, &target_categories).await?;

        let located = locate_reorderable(&mut tx, &ids).await?;
        let mut scopes: BTreeSet<Scope> = target_categories
            .iter()
            .map(|category_id| Scope::Products {
                category_id: *category_id,
            })
            .collect();
        scopes.extend(
            located
                .iter()
                .filter_map(|r| Collection::Products.scope_of(r.category_id)),
        );
        coordinator::lock_scopes(&mut tx, &scopes).await?;

        // Re-read under the scope locks
        let relocated = locate_reorderable(&mut tx, &ids).await?;
        let current: BTreeMap<Uuid, Option<Uuid>> =
            relocated.iter().map(|r| (r.id, r.category_id)).collect();
        if located.iter().any(|r| current.get(&r.id) != Some(&r.category_id)) {
            return Err(AppError::Conflict(
                "Products were moved concurrently, please retry".to_string(),
            ));
        }

        let moves: Vec<&ReorderProductItemDto> = items
            .iter()
            .filter(|i| current.get(&i.id) != Some(&Some(i.category_id)))
            .collect();
        let vacated: BTreeSet<Scope> = moves
            .iter()
            .filter_map(|i| current.get(&i.id).copied().flatten())
            .map(|category_id| Scope::Products { category_id })
            .collect();

        if !moves.is_empty() {
            let move_ids: Vec<Uuid> = moves.iter().map(|i| i.id).collect();
            let move_categories: Vec<Uuid> = moves.iter().map(|i| i.category_id).collect();
            let move_orders: Vec<i32> = moves.iter().map(|i| i.display_order).collect();
            sqlx::query(
                r#"
                UPDATE products AS p
                SET category_id = v.category_id, display_order = v.display_order, updated_at = NOW()
                FROM UNNEST($1::uuid[], $2::uuid[], $3::int4[]) AS v(id, category_id, display_order)
                WHERE p.id = v.id
                "#,
            )
            .bind(&move_ids)
            .bind(&move_categories)
            .bind(&move_orders)
            .execute(&mut *tx)
            .await
            .map_err(handle_db_error)?;

            tracing::info!("Reorder moved {} products across categories", moves.len());
        }

        let mut by_category: BTreeMap<Uuid, Vec<(Uuid, i32)>> = BTreeMap::new();
        for item in &items {
            by_category
                .entry(item.category_id)
                .or_default()
                .push((item.id, item.display_order));
        }

        for scope in &vacated {
            if let Scope::Products { category_id } = scope {
                if !by_category.contains_key(category_id) {
                    coordinator::reindex_scope(&mut tx, *scope).await?;
                }
            }
        }
        for (category_id, requested) in &by_category {
            let scope = Scope::Products {
                category_id: *category_id,
            };
            let live = coordinator::load_scope(&mut tx, scope).await?;
            let plan = plan::plan_sequence(scope, live, requested)?;
            coordinator::apply_plan(&mut tx, &plan).await?;
        }

        let affected: Vec<Uuid> = by_category
            .keys()
            .copied()
            .chain(vacated.iter().filter_map(|s| match s {
                Scope::Products { category_id } => Some(*category_id),
                _ => None,
            }))
            .collect();
        let products = fetch_live_in_categories(&mut tx, &affected).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(products.into_iter().map(|p| p.into()).collect())
    }

    /// Soft delete one product and close the gap in its category
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        coordinator::soft_delete(&mut tx, Collection::Products, &[id]).await?;
        tx.commit().await.map_err(handle_db_error)?;
        Ok(())
    }

    /// Soft delete many products; each affected category is reindexed once
    pub async fn bulk_delete(&self, ids: &[Uuid]) -> Result<BulkResultDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let outcome = coordinator::soft_delete(&mut tx, Collection::Products, ids).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(BulkResultDto {
            affected: outcome.affected,
            reindexed_scopes: outcome.plans.len(),
        })
    }

    /// Clear `deleted_at` and merge the products back by their hint order
    pub async fn restore(
        &self,
        items: Vec<RestoreProductItemDto>,
    ) -> Result<Vec<ProductResponseDto>> {
        let hints: Vec<RestoreHint> = items
            .iter()
            .map(|i| RestoreHint {
                id: i.id,
                display_order: i.display_order,
                category_id: i.category_id,
            })
            .collect();
        let ids: Vec<Uuid> = hints.iter().map(|h| h.id).collect();

        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        coordinator::reactivate(&mut tx, Collection::Products, &hints).await?;
        let products = fetch_many(&mut tx, &ids).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(products.into_iter().map(|p| p.into()).collect())
    }

    /// Irreversibly remove products
    pub async fn permanent_delete(&self, ids: &[Uuid]) -> Result<BulkResultDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let outcome = coordinator::purge(&mut tx, Collection::Products, ids).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(BulkResultDto {
            affected: outcome.affected,
            reindexed_scopes: outcome.plans.len(),
        })
    }
}

async fn fetch_one(conn: &mut PgConnection, id: Uuid) -> Result<Product> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(handle_db_error)
}

async fn fetch_live(conn: &mut PgConnection, id: Uuid) -> Result<Product> {
    let sql = format!(
        "SELECT {} FROM products WHERE id = $1 AND deleted_at IS NULL",
        PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(handle_db_error)?
        .ok_or_else(|| AppError::NotFound(format!("Product with id {} not found", id)))
}

async fn fetch_many(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE id = ANY($1) ORDER BY category_id, display_order, id",
        PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, Product>(&sql)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(handle_db_error)
}

async fn fetch_live_in_categories(
    conn: &mut PgConnection,
    category_ids: &[Uuid],
) -> Result<Vec<Product>> {
    let sql = format!(
        r#"
        SELECT {} FROM products
        WHERE category_id = ANY($1) AND deleted_at IS NULL AND is_active = TRUE
        ORDER BY category_id, display_order, id
        "#,
        PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, Product>(&sql)
        .bind(category_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(handle_db_error)
}

/// Locate products for a reorder; each must be live and active
async fn locate_reorderable(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<LocatedRecord>> {
    let located = coordinator::locate(conn, Collection::Products, ids).await?;

    let deleted: Vec<String> = located
        .iter()
        .filter(|r| r.is_deleted)
        .map(|r| r.id.to_string())
        .collect();
    if !deleted.is_empty() {
        return Err(AppError::NotFound(format!(
            "Product not found: {}",
            deleted.join(", ")
        )));
    }

    if let Some(record) = located.iter().find(|r| !r.is_active) {
        return Err(AppError::Validation(format!(
            "Product {} is inactive and has no position to reorder",
            record.id
        )));
    }

    Ok(located)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::dtos::CreateCategoryDto;
    use crate::features::categories::CategoryService;
    use rust_decimal::Decimal;

    async fn category(pool: &PgPool, name: &str) -> Uuid {
        CategoryService::new(pool.clone())
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

    async fn product(service: &ProductService, category_id: Uuid, name: &str) -> Uuid {
        service
            .create(CreateProductDto {
                category_id,
                name: name.to_string(),
                description: None,
                price: Decimal::new(350, 2),
                image: None,
                display_order: None,
                is_active: None,
            })
            .await
            .unwrap()
            .id
    }

    /// Active products of a category with their order
    async fn sequence(service: &ProductService, category_id: Uuid) -> Vec<(Uuid, i32)> {
        service
            .list(&ProductListQuery {
                category_id: Some(category_id),
            })
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.is_active)
            .map(|p| (p.id, p.display_order))
            .collect()
    }

    fn update(
        category_id: Option<Uuid>,
        is_active: Option<bool>,
        display_order: Option<i32>,
    ) -> UpdateProductDto {
        UpdateProductDto {
            name: None,
            description: None,
            price: None,
            image: None,
            is_active,
            category_id,
            display_order,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_update_moves_product_to_end_of_other_category(pool: PgPool) {
        let x = category(&pool, "Coffee").await;
        let y = category(&pool, "Tea").await;
        let service = ProductService::new(pool);
        let x0 = product(&service, x, "Espresso").await;
        let x1 = product(&service, x, "Latte").await;
        let x2 = product(&service, x, "Mocha").await;
        let y0 = product(&service, y, "Green").await;
        let y1 = product(&service, y, "Earl Grey").await;

        let moved = service.update(x1, update(Some(y), None, None)).await.unwrap();

        assert_eq!(moved.category_id, y);
        assert_eq!(sequence(&service, x).await, vec![(x0, 0), (x2, 1)]);
        assert_eq!(sequence(&service, y).await, vec![(y0, 0), (y1, 1), (x1, 2)]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_deactivate_then_reactivate_at_front(pool: PgPool) {
        let x = category(&pool, "Coffee").await;
        let service = ProductService::new(pool);
        let a = product(&service, x, "Espresso").await;
        let b = product(&service, x, "Latte").await;
        let c = product(&service, x, "Mocha").await;

        service.update(c, update(None, Some(false), None)).await.unwrap();
        assert_eq!(sequence(&service, x).await, vec![(a, 0), (b, 1)]);

        service.update(a, update(None, Some(false), None)).await.unwrap();
        assert_eq!(sequence(&service, x).await, vec![(b, 0)]);

        service.update(c, update(None, Some(true), Some(0))).await.unwrap();
        assert_eq!(sequence(&service, x).await, vec![(c, 0), (b, 1)]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_reorder_moves_across_categories(pool: PgPool) {
        let x = category(&pool, "Coffee").await;
        let y = category(&pool, "Tea").await;
        let service = ProductService::new(pool);
        let x0 = product(&service, x, "Espresso").await;
        let x1 = product(&service, x, "Latte").await;
        let x2 = product(&service, x, "Mocha").await;
        let y0 = product(&service, y, "Green").await;

        let result = service
            .reorder(vec![
                ReorderProductItemDto {
                    id: x2,
                    category_id: y,
                    display_order: 0,
                },
                ReorderProductItemDto {
                    id: x0,
                    category_id: x,
                    display_order: 2,
                },
            ])
            .await
            .unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(sequence(&service, x).await, vec![(x1, 0), (x0, 1)]);
        assert_eq!(sequence(&service, y).await, vec![(x2, 0), (y0, 1)]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_bulk_delete_counts_each_category_once(pool: PgPool) {
        let x = category(&pool, "Coffee").await;
        let y = category(&pool, "Tea").await;
        let service = ProductService::new(pool);
        let x0 = product(&service, x, "Espresso").await;
        let x1 = product(&service, x, "Latte").await;
        let x2 = product(&service, x, "Mocha").await;
        let y0 = product(&service, y, "Green").await;
        let y1 = product(&service, y, "Earl Grey").await;

        let result = service.bulk_delete(&[x0, x1, y0]).await.unwrap();

        assert_eq!(result.affected, 3);
        assert_eq!(result.reindexed_scopes, 2);
        assert_eq!(sequence(&service, x).await, vec![(x2, 0)]);
        assert_eq!(sequence(&service, y).await, vec![(y1, 0)]);
    }
}
