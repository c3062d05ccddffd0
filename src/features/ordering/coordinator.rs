//! Soft-delete, restore and purge of ordered records.
//!
//! Every function runs on a connection inside a transaction opened by the
//! caller. Nothing is committed here: an error returned from any step leaves
//! the caller's transaction to be dropped, which rolls back every status
//! change and every order write of the batch.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::ordering::engine::{self, OrderedRecord};
use crate::features::ordering::plan::{self, ReorderPlan};
use crate::features::ordering::scope::{Collection, Scope};

/// Current state of a referenced record
#[derive(Debug, Clone, FromRow)]
pub struct LocatedRecord {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub is_deleted: bool,
    pub is_active: bool,
}

/// Restore request for one soft-deleted record
#[derive(Debug, Clone, Copy)]
pub struct RestoreHint {
    pub id: Uuid,
    /// Hint for relative placement; defaults to the order held at deletion
    pub display_order: Option<i32>,
    /// Products only: restore into another category
    pub category_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct Outcome {
    pub affected: u64,
    pub plans: Vec<ReorderPlan>,
}

/// Acquire the advisory lock of every scope, in `Scope` order.
///
/// Locks are transaction-scoped and released on commit or rollback.
pub async fn lock_scopes(conn: &mut PgConnection, scopes: &BTreeSet<Scope>) -> Result<()> {
    for scope in scopes {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(scope.lock_key())
            .execute(&mut *conn)
            .await
            .map_err(handle_db_error)?;
    }
    Ok(())
}

pub async fn lock_scope(conn: &mut PgConnection, scope: Scope) -> Result<()> {
    lock_scopes(conn, &BTreeSet::from([scope])).await
}

/// Live records of a scope, ordered by `(display_order, id)`
pub async fn load_scope(conn: &mut PgConnection, scope: Scope) -> Result<Vec<OrderedRecord>> {
    let records = match scope {
        Scope::Products { category_id } => {
            sqlx::query_as::<_, OrderedRecord>(
                r#"
                SELECT id, display_order
                FROM products
                WHERE category_id = $1 AND deleted_at IS NULL AND is_active = TRUE
                ORDER BY display_order, id
                "#,
            )
            .bind(category_id)
            .fetch_all(&mut *conn)
            .await
        }
        Scope::Categories | Scope::Tables => {
            let query = format!(
                r#"
                SELECT id, display_order
                FROM {}
                WHERE deleted_at IS NULL
                ORDER BY display_order, id
                "#,
                scope.collection().table()
            );
            sqlx::query_as::<_, OrderedRecord>(&query)
                .fetch_all(&mut *conn)
                .await
        }
    };

    records.map_err(|e| {
        tracing::error!("Failed to load {}: {:?}", scope, e);
        handle_db_error(e)
    })
}

/// Persist the writes of a plan as one multi-row statement
pub async fn apply_plan(conn: &mut PgConnection, plan: &ReorderPlan) -> Result<usize> {
    if plan.is_empty() {
        tracing::debug!("{} has no live records left to reindex", plan.scope);
        return Ok(0);
    }
    let writes = plan.writes();
    if writes.is_empty() {
        return Ok(0);
    }

    let ids: Vec<Uuid> = writes.iter().map(|w| w.id).collect();
    let orders: Vec<i32> = writes.iter().map(|w| w.display_order).collect();

    let query = format!(
        r#"
        UPDATE {} AS t
        SET display_order = v.display_order, updated_at = NOW()
        FROM UNNEST($1::uuid[], $2::int4[]) AS v(id, display_order)
        WHERE t.id = v.id
        "#,
        plan.scope.collection().table()
    );
    sqlx::query(&query)
        .bind(&ids)
        .bind(&orders)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to reindex {}: {:?}", plan.scope, e);
            handle_db_error(e)
        })?;

    tracing::info!(
        "Reindexed {}: {} records, {} order writes",
        plan.scope,
        plan.len(),
        writes.len()
    );
    Ok(writes.len())
}

/// Rebuild a contiguous sequence over a scope as it currently stands
pub async fn reindex_scope(conn: &mut PgConnection, scope: Scope) -> Result<ReorderPlan> {
    let live = load_scope(conn, scope).await?;
    let plan = ReorderPlan::normalize(scope, live);
    apply_plan(conn, &plan).await?;
    Ok(plan)
}

/// Slot right after the scope's highest order
pub async fn append_slot(conn: &mut PgConnection, scope: Scope) -> Result<i32> {
    let live = load_scope(conn, scope).await?;
    Ok(engine::next_order(&live, scope.base()))
}

/// Move `record`, already stored in `scope`, to `position` (or keep it last)
pub async fn place_record(
    conn: &mut PgConnection,
    scope: Scope,
    record: OrderedRecord,
    position: Option<i32>,
) -> Result<ReorderPlan> {
    let live = load_scope(conn, scope).await?;
    let plan = plan::plan_insert_at(scope, live, record, position);
    apply_plan(conn, &plan).await?;
    tracing::debug!(
        "Placed {} at {:?} in {}",
        record.id,
        plan.order_of(record.id),
        scope
    );
    Ok(plan)
}

/// Find `ids` in a collection; every id must exist
pub async fn locate(
    conn: &mut PgConnection,
    collection: Collection,
    ids: &[Uuid],
) -> Result<Vec<LocatedRecord>> {
    let query = format!(
        r#"
        SELECT id, {} AS category_id, deleted_at IS NOT NULL AS is_deleted, is_active
        FROM {}
        WHERE id = ANY($1)
        "#,
        collection.scope_column(),
        collection.table()
    );
    let found = sqlx::query_as::<_, LocatedRecord>(&query)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(handle_db_error)?;

    let found_ids: HashSet<Uuid> = found.iter().map(|r| r.id).collect();
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found_ids.contains(id))
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::NotFound(format!(
            "{} not found: {}",
            collection.label(),
            missing.join(", ")
        )));
    }

    Ok(found)
}

fn scopes_of(collection: Collection, records: &[LocatedRecord]) -> BTreeSet<Scope> {
    records
        .iter()
        .filter_map(|r| collection.scope_of(r.category_id))
        .collect()
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Soft-delete live records and reindex each affected scope once.
///
/// Fails with `NotFound` when any id is absent or already deleted.
pub async fn soft_delete(
    conn: &mut PgConnection,
    collection: Collection,
    ids: &[Uuid],
) -> Result<Outcome> {
    let ids = dedup(ids);
    let located = locate(conn, collection, &ids).await?;

    let already_deleted: Vec<String> = located
        .iter()
        .filter(|r| r.is_deleted)
        .map(|r| r.id.to_string())
        .collect();
    if !already_deleted.is_empty() {
        return Err(AppError::NotFound(format!(
            "{} not found: {}",
            collection.label(),
            already_deleted.join(", ")
        )));
    }

    let scopes = scopes_of(collection, &located);
    lock_scopes(conn, &scopes).await?;

    let mut snapshots = BTreeMap::new();
    for scope in &scopes {
        snapshots.insert(*scope, load_scope(conn, *scope).await?);
    }

    let query = format!(
        r#"
        UPDATE {}
        SET deleted_at = NOW(), updated_at = NOW()
        WHERE id = ANY($1) AND deleted_at IS NULL
        RETURNING id, {} AS category_id, TRUE AS is_deleted, is_active
        "#,
        collection.table(),
        collection.scope_column()
    );
    let deleted = sqlx::query_as::<_, LocatedRecord>(&query)
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(handle_db_error)?;

    // Rows moved or deleted between locate and lock
    if deleted.len() != ids.len() || !scopes_of(collection, &deleted).is_subset(&scopes) {
        return Err(AppError::Conflict(format!(
            "{} records changed concurrently, please retry",
            collection.label()
        )));
    }

    let removed: HashSet<Uuid> = ids.iter().copied().collect();
    let mut plans = Vec::with_capacity(snapshots.len());
    for (scope, live) in snapshots {
        let plan = plan::plan_removal(scope, live, &removed);
        apply_plan(conn, &plan).await?;
        plans.push(plan);
    }

    tracing::info!(
        "Soft-deleted {} {} records across {} scopes",
        deleted.len(),
        collection.label(),
        plans.len()
    );

    Ok(Outcome {
        affected: deleted.len() as u64,
        plans,
    })
}

/// Reactivate soft-deleted records and merge them back into their scopes.
///
/// Each record takes its hint order verbatim before the single reindex pass
/// of its scope, so collisions with live records are transient.
pub async fn reactivate(
    conn: &mut PgConnection,
    collection: Collection,
    hints: &[RestoreHint],
) -> Result<Outcome> {
    let ids = dedup(&hints.iter().map(|h| h.id).collect::<Vec<_>>());
    let located = locate(conn, collection, &ids).await?;

    let not_deleted: Vec<String> = located
        .iter()
        .filter(|r| !r.is_deleted)
        .map(|r| r.id.to_string())
        .collect();
    if !not_deleted.is_empty() {
        return Err(AppError::NotFound(format!(
            "No deleted {} with id: {}",
            collection.label().to_lowercase(),
            not_deleted.join(", ")
        )));
    }

    // Target scope of every record, honouring category overrides
    let overrides: BTreeMap<Uuid, Uuid> = hints
        .iter()
        .filter_map(|h| h.category_id.map(|c| (h.id, c)))
        .collect();
    let targets: Vec<LocatedRecord> = located
        .into_iter()
        .map(|mut r| {
            if let Some(category_id) = overrides.get(&r.id) {
                r.category_id = Some(*category_id);
            }
            r
        })
        .collect();

    if collection == Collection::Products {
        let categories: Vec<Uuid> = targets.iter().filter_map(|r| r.category_id).collect();
        ensure_live_categories(conn, &categories).await?;
    }

    let scopes = scopes_of(collection, &targets);
    lock_scopes(conn, &scopes).await?;

    let mut snapshots = BTreeMap::new();
    for scope in &scopes {
        snapshots.insert(*scope, load_scope(conn, *scope).await?);
    }

    let hint_ids: Vec<Uuid> = hints.iter().map(|h| h.id).collect();
    let hint_orders: Vec<Option<i32>> = hints.iter().map(|h| h.display_order).collect();
    let query = match collection {
        Collection::Products => {
            let hint_categories: Vec<Option<Uuid>> = hints.iter().map(|h| h.category_id).collect();
            sqlx::query_as::<_, RestoredRow>(
                r#"
                UPDATE products AS t
                SET deleted_at = NULL,
                    display_order = COALESCE(v.display_order, t.display_order),
                    category_id = COALESCE(v.category_id, t.category_id),
                    updated_at = NOW()
                FROM UNNEST($1::uuid[], $2::int4[], $3::uuid[]) AS v(id, display_order, category_id)
                WHERE t.id = v.id AND t.deleted_at IS NOT NULL
                RETURNING t.id, t.display_order, t.category_id, t.is_active
                "#,
            )
            .bind(&hint_ids)
            .bind(&hint_orders)
            .bind(hint_categories)
            .fetch_all(&mut *conn)
            .await
        }
        Collection::Categories | Collection::Tables => {
            let query = format!(
                r#"
                UPDATE {} AS t
                SET deleted_at = NULL,
                    display_order = COALESCE(v.display_order, t.display_order),
                    updated_at = NOW()
                FROM UNNEST($1::uuid[], $2::int4[]) AS v(id, display_order)
                WHERE t.id = v.id AND t.deleted_at IS NOT NULL
                RETURNING t.id, t.display_order, NULL::uuid AS category_id, t.is_active
                "#,
                collection.table()
            );
            sqlx::query_as::<_, RestoredRow>(&query)
                .bind(&hint_ids)
                .bind(&hint_orders)
                .fetch_all(&mut *conn)
                .await
        }
    };
    let restored = query.map_err(handle_db_error)?;

    if restored.len() != ids.len() {
        return Err(AppError::Conflict(format!(
            "{} records changed concurrently, please retry",
            collection.label()
        )));
    }

    let mut plans = Vec::with_capacity(snapshots.len());
    for (scope, live) in snapshots {
        // Inactive products are restored outside the ordering scope
        let members: Vec<OrderedRecord> = restored
            .iter()
            .filter(|r| {
                collection.orders_member(r.is_active)
                    && collection.scope_of(r.category_id) == Some(scope)
            })
            .map(|r| OrderedRecord::new(r.id, r.display_order))
            .collect();
        let plan = plan::plan_restore(scope, live, members);
        apply_plan(conn, &plan).await?;
        plans.push(plan);
    }

    tracing::info!(
        "Restored {} {} records across {} scopes",
        restored.len(),
        collection.label(),
        plans.len()
    );

    Ok(Outcome {
        affected: restored.len() as u64,
        plans,
    })
}

#[derive(Debug, FromRow)]
struct RestoredRow {
    id: Uuid,
    display_order: i32,
    category_id: Option<Uuid>,
    is_active: bool,
}

/// Permanently remove records.
///
/// Records still live are soft-deleted and their scopes reindexed first, in
/// the same transaction, so purging never leaves a gap behind.
pub async fn purge(
    conn: &mut PgConnection,
    collection: Collection,
    ids: &[Uuid],
) -> Result<Outcome> {
    let ids = dedup(ids);
    let located = locate(conn, collection, &ids).await?;

    let live: Vec<Uuid> = located
        .iter()
        .filter(|r| !r.is_deleted)
        .map(|r| r.id)
        .collect();
    let plans = if live.is_empty() {
        Vec::new()
    } else {
        tracing::info!(
            "Purging {} live {} records, soft-deleting first",
            live.len(),
            collection.label()
        );
        soft_delete(conn, collection, &live).await?.plans
    };

    let query = format!("DELETE FROM {} WHERE id = ANY($1)", collection.table());
    let result = sqlx::query(&query)
        .bind(&ids)
        .execute(&mut *conn)
        .await
        .map_err(handle_db_error)?;

    tracing::info!(
        "Purged {} {} records",
        result.rows_affected(),
        collection.label()
    );

    Ok(Outcome {
        affected: result.rows_affected(),
        plans,
    })
}

/// Fail with `NotFound` unless every category exists and is not deleted
pub async fn ensure_live_categories(conn: &mut PgConnection, ids: &[Uuid]) -> Result<()> {
    let ids = dedup(ids);
    let found: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM categories WHERE id = ANY($1) AND deleted_at IS NULL",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(handle_db_error)?;

    let found: HashSet<Uuid> = found.into_iter().collect();
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::NotFound(format!(
            "Category not found: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
