//! Pure planning for scope mutations.
//!
//! Every function here takes a snapshot of a scope's live records (with their
//! currently stored `display_order`) and returns a [`ReorderPlan`]: the final
//! sequence of the scope. Persisting the plan's writes restores contiguity.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::ordering::engine::{self, pending_writes, OrderAssignment, OrderedRecord};
use crate::features::ordering::scope::Scope;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("{0} is not a live member of {1}")]
    UnknownRecord(Uuid, Scope),

    #[error("Requested order for {0} is not contiguous from {1}")]
    NotContiguous(Scope, i32),
}

impl From<PlanError> for AppError {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::UnknownRecord(..) => AppError::NotFound(e.to_string()),
            PlanError::NotContiguous(..) => AppError::Validation(e.to_string()),
        }
    }
}

/// Final sequence of one scope.
///
/// `sequence` holds the records in their target order, each still carrying
/// the `display_order` currently stored for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub scope: Scope,
    pub sequence: Vec<OrderedRecord>,
}

impl ReorderPlan {
    /// Plan that keeps the scope's current relative order
    pub fn normalize(scope: Scope, mut records: Vec<OrderedRecord>) -> Self {
        engine::sort_scope(&mut records);
        Self {
            scope,
            sequence: records,
        }
    }

    /// Writes needed to move the store from its current state to the plan
    pub fn writes(&self) -> Vec<OrderAssignment> {
        pending_writes(&self.sequence, self.scope.base())
    }

    /// Final order of `id` once the plan is applied
    pub fn order_of(&self, id: Uuid) -> Option<i32> {
        self.sequence
            .iter()
            .position(|r| r.id == id)
            .map(|position| self.scope.base() + position as i32)
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Reindex what remains of a scope after `removed` leave it
pub fn plan_removal(
    scope: Scope,
    live: Vec<OrderedRecord>,
    removed: &HashSet<Uuid>,
) -> ReorderPlan {
    let remaining = live
        .into_iter()
        .filter(|r| !removed.contains(&r.id))
        .collect();
    ReorderPlan::normalize(scope, remaining)
}

/// Merge restored records, each carrying its hint order, into a scope.
///
/// Hints are taken verbatim and may collide with live orders; the merged scope
/// is sorted by `(display_order, id)` so restored records keep their relative
/// order among themselves.
pub fn plan_restore(
    scope: Scope,
    live: Vec<OrderedRecord>,
    restored: Vec<OrderedRecord>,
) -> ReorderPlan {
    let restored_ids: HashSet<Uuid> = restored.iter().map(|r| r.id).collect();
    let merged = live
        .into_iter()
        .filter(|r| !restored_ids.contains(&r.id))
        .chain(restored)
        .collect();
    ReorderPlan::normalize(scope, merged)
}

/// Place `record` at `position` (a scope order value), or append it.
///
/// Positions beyond the end of the scope append; positions before the base
/// insert at the front.
pub fn plan_insert_at(
    scope: Scope,
    live: Vec<OrderedRecord>,
    record: OrderedRecord,
    position: Option<i32>,
) -> ReorderPlan {
    let mut sequence = ReorderPlan::normalize(
        scope,
        live.into_iter().filter(|r| r.id != record.id).collect(),
    )
    .sequence;

    let index = match position {
        Some(position) => (position - scope.base()).clamp(0, sequence.len() as i32) as usize,
        None => sequence.len(),
    };
    sequence.insert(index, record);

    ReorderPlan { scope, sequence }
}

/// Apply a requested `(id, order)` sequence onto a scope.
///
/// Requested records sort by their requested order (ties keep request order);
/// records not mentioned keep their current order and yield to requested
/// records on ties. The result is reindexed from the scope's base.
pub fn plan_sequence(
    scope: Scope,
    live: Vec<OrderedRecord>,
    requested: &[(Uuid, i32)],
) -> Result<ReorderPlan, PlanError> {
    let current: HashMap<Uuid, OrderedRecord> = live.iter().map(|r| (r.id, *r)).collect();

    let mut requested_positions: HashMap<Uuid, (i32, usize)> = HashMap::new();
    for (index, (id, order)) in requested.iter().enumerate() {
        if !current.contains_key(id) {
            return Err(PlanError::UnknownRecord(*id, scope));
        }
        requested_positions.insert(*id, (*order, index));
    }

    let mut keyed: Vec<((i32, u8, usize, Uuid), OrderedRecord)> = live
        .into_iter()
        .map(|record| {
            let key = match requested_positions.get(&record.id) {
                Some((order, index)) => (*order, 0, *index, record.id),
                None => (record.display_order, 1, 0, record.id),
            };
            (key, record)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(ReorderPlan {
        scope,
        sequence: keyed.into_iter().map(|(_, record)| record).collect(),
    })
}

/// Apply requested order values verbatim.
///
/// The scope's resulting values (requested values plus the current values of
/// records not mentioned) must already be contiguous from the base.
pub fn plan_verbatim(
    scope: Scope,
    live: Vec<OrderedRecord>,
    requested: &[(Uuid, i32)],
) -> Result<ReorderPlan, PlanError> {
    let live_ids: HashSet<Uuid> = live.iter().map(|r| r.id).collect();
    if let Some((id, _)) = requested.iter().find(|(id, _)| !live_ids.contains(id)) {
        return Err(PlanError::UnknownRecord(*id, scope));
    }

    let targets: HashMap<Uuid, i32> = requested.iter().copied().collect();
    let mut keyed: Vec<(i32, OrderedRecord)> = live
        .into_iter()
        .map(|r| (targets.get(&r.id).copied().unwrap_or(r.display_order), r))
        .collect();

    let finals: Vec<i32> = keyed.iter().map(|(order, _)| *order).collect();
    if !engine::is_contiguous(&finals, scope.base()) {
        return Err(PlanError::NotContiguous(scope, scope.base()));
    }

    keyed.sort_by_key(|(order, _)| *order);
    Ok(ReorderPlan {
        scope,
        sequence: keyed.into_iter().map(|(_, record)| record).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ordering::engine::reindex;

    fn ids(n: usize) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = (0..n).map(|_| Uuid::now_v7()).collect();
        ids.sort();
        ids
    }

    fn scope_of(records: &[(Uuid, i32)]) -> Vec<OrderedRecord> {
        records
            .iter()
            .map(|(id, order)| OrderedRecord::new(*id, *order))
            .collect()
    }

    fn assignments(plan: &ReorderPlan) -> Vec<OrderAssignment> {
        reindex(&plan.sequence, plan.scope.base())
    }

    fn final_orders(plan: &ReorderPlan) -> Vec<(Uuid, i32)> {
        assignments(plan)
            .into_iter()
            .map(|a| (a.id, a.display_order))
            .collect()
    }

    #[test]
    fn test_delete_closes_gap_in_category() {
        let ids = ids(4);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        let category_id = Uuid::now_v7();
        let scope = Scope::Products { category_id };
        let live = scope_of(&[(a, 0), (b, 1), (c, 2), (d, 3)]);

        let plan = plan_removal(scope, live, &HashSet::from([b]));

        assert_eq!(final_orders(&plan), vec![(a, 0), (c, 1), (d, 2)]);
        assert_eq!(plan.writes().len(), 2);
    }

    #[test]
    fn test_removing_every_member_leaves_empty_plan() {
        let ids = ids(2);
        let live = scope_of(&[(ids[0], 1), (ids[1], 2)]);

        let plan = plan_removal(Scope::Tables, live, &ids.iter().copied().collect());

        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
        assert!(plan.writes().is_empty());
    }

    #[test]
    fn test_tables_append_one_based_in_creation_order() {
        let ids = ids(3);
        let mut live: Vec<OrderedRecord> = Vec::new();

        for id in &ids {
            let slot = engine::next_order(&live, Scope::Tables.base());
            let record = OrderedRecord::new(*id, slot);
            let plan = plan_insert_at(Scope::Tables, live.clone(), record, None);
            assert!(plan.writes().is_empty());
            live = assignments(&plan)
                .into_iter()
                .map(|a| OrderedRecord::new(a.id, a.display_order))
                .collect();
        }

        let orders: Vec<(Uuid, i32)> = live.iter().map(|r| (r.id, r.display_order)).collect();
        assert_eq!(orders, vec![(ids[0], 1), (ids[1], 2), (ids[2], 3)]);
    }

    #[test]
    fn test_bulk_restore_appends_by_hint() {
        let ids = ids(4);
        let live = scope_of(&[(ids[0], 0), (ids[1], 1)]);
        let restored = scope_of(&[(ids[2], 5), (ids[3], 2)]);

        let plan = plan_restore(Scope::Categories, live, restored);

        assert_eq!(
            final_orders(&plan),
            vec![(ids[0], 0), (ids[1], 1), (ids[3], 2), (ids[2], 3)]
        );
    }

    #[test]
    fn test_restore_keeps_relative_order_among_restored() {
        // Four categories deleted with orders [0, 1, 2, 3]; the ones at 1 and 3 come back
        let ids = ids(5);
        let live = scope_of(&[(ids[4], 0)]);
        let restored = scope_of(&[(ids[3], 3), (ids[1], 1)]);

        let plan = plan_restore(Scope::Categories, live, restored);

        assert_eq!(
            final_orders(&plan),
            vec![(ids[4], 0), (ids[1], 1), (ids[3], 2)]
        );
        assert!(engine::is_contiguous(
            &assignments(&plan)
                .iter()
                .map(|a| a.display_order)
                .collect::<Vec<_>>(),
            0
        ));
    }

    #[test]
    fn test_restore_hint_collision_breaks_tie_by_id() {
        let ids = ids(3);
        let live = scope_of(&[(ids[0], 0), (ids[2], 1)]);
        let restored = scope_of(&[(ids[1], 1)]);

        let plan = plan_restore(Scope::Categories, live, restored);

        assert_eq!(
            final_orders(&plan),
            vec![(ids[0], 0), (ids[1], 1), (ids[2], 2)]
        );
    }

    #[test]
    fn test_cross_category_move() {
        let ids = ids(5);
        let (x, y) = (Uuid::now_v7(), Uuid::now_v7());
        let moving = ids[1];
        let x_live = scope_of(&[(ids[0], 0), (moving, 1), (ids[2], 2)]);
        let y_live = scope_of(&[(ids[3], 0), (ids[4], 1)]);

        let from = plan_removal(
            Scope::Products { category_id: x },
            x_live,
            &HashSet::from([moving]),
        );
        let slot = engine::next_order(&y_live, 0);
        let to = plan_insert_at(
            Scope::Products { category_id: y },
            y_live,
            OrderedRecord::new(moving, slot),
            None,
        );

        assert_eq!(final_orders(&from), vec![(ids[0], 0), (ids[2], 1)]);
        assert_eq!(to.order_of(moving), Some(2));
        assert!(to.writes().is_empty());
    }

    #[test]
    fn test_insert_at_explicit_position_shifts_followers() {
        let ids = ids(4);
        let live = scope_of(&[(ids[0], 0), (ids[1], 1), (ids[2], 2)]);

        let plan = plan_insert_at(
            Scope::Categories,
            live,
            OrderedRecord::new(ids[3], 3),
            Some(1),
        );

        assert_eq!(
            final_orders(&plan),
            vec![(ids[0], 0), (ids[3], 1), (ids[1], 2), (ids[2], 3)]
        );
    }

    #[test]
    fn test_insert_at_clamps_out_of_range_positions() {
        let ids = ids(3);
        let live = scope_of(&[(ids[0], 1), (ids[1], 2)]);

        let front = plan_insert_at(
            Scope::Tables,
            live.clone(),
            OrderedRecord::new(ids[2], 3),
            Some(-4),
        );
        let back = plan_insert_at(Scope::Tables, live, OrderedRecord::new(ids[2], 3), Some(40));

        assert_eq!(front.order_of(ids[2]), Some(1));
        assert_eq!(back.order_of(ids[2]), Some(3));
    }

    #[test]
    fn test_sequence_full_submission_wins() {
        let ids = ids(3);
        let scope = Scope::Products {
            category_id: Uuid::now_v7(),
        };
        let live = scope_of(&[(ids[0], 0), (ids[1], 1), (ids[2], 2)]);

        let plan = plan_sequence(scope, live, &[(ids[2], 0), (ids[0], 1), (ids[1], 2)])
            .expect("plan");

        assert_eq!(
            final_orders(&plan),
            vec![(ids[2], 0), (ids[0], 1), (ids[1], 2)]
        );
    }

    #[test]
    fn test_sequence_with_gaps_and_partial_request() {
        let ids = ids(3);
        let scope = Scope::Products {
            category_id: Uuid::now_v7(),
        };
        let live = scope_of(&[(ids[0], 0), (ids[1], 1), (ids[2], 2)]);

        // Only ids[2] moves to the front; the others keep their relative order
        let plan = plan_sequence(scope, live, &[(ids[2], 0)]).expect("plan");

        assert_eq!(
            final_orders(&plan),
            vec![(ids[2], 0), (ids[0], 1), (ids[1], 2)]
        );
    }

    #[test]
    fn test_sequence_rejects_unknown_record() {
        let ids = ids(2);
        let live = scope_of(&[(ids[0], 0)]);

        let err = plan_sequence(Scope::Categories, live, &[(ids[1], 0)]).unwrap_err();
        assert_eq!(err, PlanError::UnknownRecord(ids[1], Scope::Categories));
    }

    #[test]
    fn test_verbatim_accepts_contiguous_permutation() {
        let ids = ids(3);
        let live = scope_of(&[(ids[0], 0), (ids[1], 1), (ids[2], 2)]);

        let plan = plan_verbatim(Scope::Categories, live, &[(ids[0], 2), (ids[2], 0)])
            .expect("plan");

        assert_eq!(
            final_orders(&plan),
            vec![(ids[2], 0), (ids[1], 1), (ids[0], 2)]
        );
        assert_eq!(plan.writes().len(), 2);
    }

    #[test]
    fn test_verbatim_rejects_gaps_and_duplicates() {
        let ids = ids(3);
        let live = scope_of(&[(ids[0], 0), (ids[1], 1), (ids[2], 2)]);

        let duplicate = plan_verbatim(Scope::Categories, live.clone(), &[(ids[0], 1)]);
        let gap = plan_verbatim(Scope::Categories, live, &[(ids[2], 5)]);

        assert_eq!(
            duplicate.unwrap_err(),
            PlanError::NotContiguous(Scope::Categories, 0)
        );
        assert!(matches!(gap, Err(PlanError::NotContiguous(..))));
    }

    #[test]
    fn test_plan_error_maps_to_app_error() {
        let not_found: AppError = PlanError::UnknownRecord(Uuid::now_v7(), Scope::Tables).into();
        let invalid: AppError = PlanError::NotContiguous(Scope::Tables, 1).into();

        assert!(matches!(not_found, AppError::NotFound(_)));
        assert!(matches!(invalid, AppError::Validation(_)));
    }
}
