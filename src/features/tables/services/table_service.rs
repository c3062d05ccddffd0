use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::ordering::{coordinator, Collection, OrderedRecord, RestoreHint, Scope};
use crate::features::tables::dtos::{
    CreateTableDto, RestoreTableItemDto, TableResponseDto, UpdateTableDto,
};
use crate::features::tables::models::{DiningTable, TABLE_COLUMNS};
use crate::shared::types::BulkResultDto;

/// Service for dining tables.
///
/// All live tables share one sequence numbered from 1, whether active or not.
pub struct TableService {
    pool: PgPool,
}

impl TableService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<TableResponseDto>> {
        let query = format!(
            "SELECT {} FROM dining_tables WHERE deleted_at IS NULL ORDER BY display_order, id",
            TABLE_COLUMNS
        );
        let tables = sqlx::query_as::<_, DiningTable>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list tables: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(tables.into_iter().map(|t| t.into()).collect())
    }

    pub async fn list_deleted(&self) -> Result<Vec<TableResponseDto>> {
        let query = format!(
            "SELECT {} FROM dining_tables WHERE deleted_at IS NOT NULL ORDER BY deleted_at DESC, id",
            TABLE_COLUMNS
        );
        let tables = sqlx::query_as::<_, DiningTable>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list deleted tables: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(tables.into_iter().map(|t| t.into()).collect())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<TableResponseDto> {
        let query = format!("SELECT {} FROM dining_tables WHERE id = $1", TABLE_COLUMNS);
        sqlx::query_as::<_, DiningTable>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get table: {:?}", e);
                AppError::Database(e)
            })?
            .map(|t| t.into())
            .ok_or_else(|| AppError::NotFound(format!("Table with id {} not found", id)))
    }

    /// Add a table after the last one, or at the given number
    pub async fn create(&self, dto: CreateTableDto) -> Result<TableResponseDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let scope = Scope::Tables;
        coordinator::lock_scope(&mut tx, scope).await?;

        let id = Uuid::now_v7();
        let slot = coordinator::append_slot(&mut tx, scope).await?;
        sqlx::query(
            r#"
            INSERT INTO dining_tables (id, name, display_order, is_active)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(&dto.name)
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

        let table = fetch_one(&mut tx, id).await?;
        tx.commit().await.map_err(handle_db_error)?;

        tracing::info!(
            "Table created: id={}, display_order={}",
            table.id,
            table.display_order
        );
        Ok(table.into())
    }

    /// Rename, toggle or renumber a live table
    pub async fn update(&self, id: Uuid, dto: UpdateTableDto) -> Result<TableResponseDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let scope = Scope::Tables;
        if dto.display_order.is_some() {
            coordinator::lock_scope(&mut tx, scope).await?;
        }

        let query = format!(
            r#"
            UPDATE dining_tables
            SET name = COALESCE($1, name),
                is_active = COALESCE($2, is_active),
                updated_at = NOW()
            WHERE id = $3 AND deleted_at IS NULL
            RETURNING {}
            "#,
            TABLE_COLUMNS
        );
        let table = sqlx::query_as::<_, DiningTable>(&query)
            .bind(&dto.name)
            .bind(dto.is_active)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(handle_db_error)?
            .ok_or_else(|| AppError::NotFound(format!("Table with id {} not found", id)))?;

        let table = match dto.display_order {
            Some(position) => {
                coordinator::place_record(
                    &mut tx,
                    scope,
                    OrderedRecord::new(table.id, table.display_order),
                    Some(position),
                )
                .await?;
                fetch_one(&mut tx, id).await?
            }
            None => table,
        };
        tx.commit().await.map_err(handle_db_error)?;

        Ok(table.into())
    }

    /// Renumber every live table from 1, keeping their relative order
    pub async fn reindex(&self) -> Result<Vec<TableResponseDto>> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        coordinator::lock_scope(&mut tx, Scope::Tables).await?;
        coordinator::reindex_scope(&mut tx, Scope::Tables).await?;
        tx.commit().await.map_err(handle_db_error)?;

        self.list().await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        coordinator::soft_delete(&mut tx, Collection::Tables, &[id]).await?;
        tx.commit().await.map_err(handle_db_error)?;
        Ok(())
    }

    pub async fn bulk_delete(&self, ids: &[Uuid]) -> Result<BulkResultDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let outcome = coordinator::soft_delete(&mut tx, Collection::Tables, ids).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(BulkResultDto {
            affected: outcome.affected,
            reindexed_scopes: outcome.plans.len(),
        })
    }

    /// Reactivate tables, merging them back by their hint numbers
    pub async fn restore(&self, items: Vec<RestoreTableItemDto>) -> Result<Vec<TableResponseDto>> {
        let hints: Vec<RestoreHint> = items
            .iter()
            .map(|i| RestoreHint {
                id: i.id,
                display_order: i.display_order,
                category_id: None,
            })
            .collect();
        let ids: Vec<Uuid> = hints.iter().map(|h| h.id).collect();

        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        coordinator::reactivate(&mut tx, Collection::Tables, &hints).await?;
        let tables = fetch_many(&mut tx, &ids).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(tables.into_iter().map(|t| t.into()).collect())
    }

    pub async fn permanent_delete(&self, ids: &[Uuid]) -> Result<BulkResultDto> {
        let mut tx = self.pool.begin().await.map_err(handle_db_error)?;
        let outcome = coordinator::purge(&mut tx, Collection::Tables, ids).await?;
        tx.commit().await.map_err(handle_db_error)?;

        Ok(BulkResultDto {
            affected: outcome.affected,
            reindexed_scopes: outcome.plans.len(),
        })
    }
}

async fn fetch_one(conn: &mut PgConnection, id: Uuid) -> Result<DiningTable> {
    let query = format!("SELECT {} FROM dining_tables WHERE id = $1", TABLE_COLUMNS);
    sqlx::query_as::<_, DiningTable>(&query)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(handle_db_error)
}

async fn fetch_many(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<DiningTable>> {
    let query = format!(
        "SELECT {} FROM dining_tables WHERE id = ANY($1) ORDER BY display_order, id",
        TABLE_COLUMNS
    );
    sqlx::query_as::<_, DiningTable>(&query)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(handle_db_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn numbers(service: &TableService) -> Vec<(String, i32)> {
        service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.name, t.display_order))
            .collect()
    }

    async fn create(service: &TableService, name: &str, display_order: Option<i32>) -> Uuid {
        service
            .create(CreateTableDto {
                name: name.to_string(),
                display_order,
                is_active: None,
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_tables_number_from_one(pool: PgPool) {
        let service = TableService::new(pool);
        create(&service, "T1", None).await;
        create(&service, "T2", None).await;
        create(&service, "Window", Some(1)).await;

        assert_eq!(
            numbers(&service).await,
            vec![
                ("Window".to_string(), 1),
                ("T1".to_string(), 2),
                ("T2".to_string(), 3)
            ]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_delete_then_restore_keeps_identity(pool: PgPool) {
        let service = TableService::new(pool);
        let a = create(&service, "A", None).await;
        let b = create(&service, "B", None).await;
        let c = create(&service, "C", None).await;

        service.delete(b).await.unwrap();
        assert_eq!(
            numbers(&service).await,
            vec![("A".to_string(), 1), ("C".to_string(), 2)]
        );

        let restored = service
            .restore(vec![RestoreTableItemDto {
                id: b,
                display_order: None,
            }])
            .await
            .unwrap();
        assert_eq!(restored[0].id, b);

        let ids: Vec<Uuid> = service.list().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_reindex_closes_gaps(pool: PgPool) {
        for (name, order) in [("A", 2), ("B", 5), ("C", 9)] {
            sqlx::query("INSERT INTO dining_tables (id, name, display_order) VALUES ($1, $2, $3)")
                .bind(Uuid::now_v7())
                .bind(name)
                .bind(order)
                .execute(&pool)
                .await
                .unwrap();
        }
        let service = TableService::new(pool);

        service.reindex().await.unwrap();

        assert_eq!(
            numbers(&service).await,
            vec![
                ("A".to_string(), 1),
                ("B".to_string(), 2),
                ("C".to_string(), 3)
            ]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn test_restore_inactive_table_keeps_numbering(pool: PgPool) {
        let service = TableService::new(pool);
        create(&service, "T1", None).await;
        let closed = service
            .create(CreateTableDto {
                name: "Terrace".to_string(),
                display_order: None,
                is_active: Some(false),
            })
            .await
            .unwrap()
            .id;
        create(&service, "T3", None).await;

        service.delete(closed).await.unwrap();
        service
            .restore(vec![RestoreTableItemDto {
                id: closed,
                display_order: None,
            }])
            .await
            .unwrap();

        assert_eq!(
            numbers(&service).await,
            vec![
                ("T1".to_string(), 1),
                ("Terrace".to_string(), 2),
                ("T3".to_string(), 3)
            ]
        );
    }
}
