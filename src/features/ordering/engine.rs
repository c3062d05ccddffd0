use sqlx::FromRow;
use uuid::Uuid;

/// A record as seen by the ordering engine: its identity and current position
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct OrderedRecord {
    pub id: Uuid,
    pub display_order: i32,
}

impl OrderedRecord {
    pub fn new(id: Uuid, display_order: i32) -> Self {
        Self { id, display_order }
    }
}

/// Target position for one record after a reindex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAssignment {
    pub id: Uuid,
    pub display_order: i32,
}

/// Sort a scope by `(display_order, id)` ascending.
///
/// Ties on `display_order` are broken by id so that the resulting sequence is
/// deterministic. Ids are UUID v7, so ties resolve in creation order.
pub fn sort_scope(records: &mut [OrderedRecord]) {
    records.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Assign `base + position` to every record, keeping the input sequence.
///
/// The input is expected to be sorted already (see [`sort_scope`]).
pub fn reindex(records: &[OrderedRecord], base: i32) -> Vec<OrderAssignment> {
    records
        .iter()
        .zip(base..)
        .map(|(record, display_order)| OrderAssignment {
            id: record.id,
            display_order,
        })
        .collect()
}

/// Only the assignments whose value differs from the record's current order
pub fn pending_writes(records: &[OrderedRecord], base: i32) -> Vec<OrderAssignment> {
    records
        .iter()
        .zip(reindex(records, base))
        .filter(|(record, assignment)| record.display_order != assignment.display_order)
        .map(|(_, assignment)| assignment)
        .collect()
}

/// True when `orders` is exactly `base, base + 1, ...` in some permutation
pub fn is_contiguous(orders: &[i32], base: i32) -> bool {
    let mut sorted = orders.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .zip(base..)
        .all(|(actual, expected)| *actual == expected)
}

/// Position right after the highest order in the scope, or `base` when empty
pub fn next_order(records: &[OrderedRecord], base: i32) -> i32 {
    records
        .iter()
        .map(|r| r.display_order + 1)
        .max()
        .map_or(base, |next| next.max(base))
}
