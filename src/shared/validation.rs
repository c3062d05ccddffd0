use std::collections::HashSet;
use std::hash::Hash;

use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::shared::constants::MAX_BATCH_SIZE;

/// Reject empty or oversized batches, then validate every item.
///
/// Runs before any store access so a bad batch has no partial effect.
pub fn validate_batch<T: Validate>(items: &[T]) -> Result<()> {
    ensure_batch_size(items.len())?;

    for (index, item) in items.iter().enumerate() {
        item.validate()
            .map_err(|e| AppError::Validation(format!("item {}: {}", index, e)))?;
    }

    Ok(())
}

pub fn ensure_batch_size(len: usize) -> Result<()> {
    if len == 0 {
        return Err(AppError::Validation(
            "At least one item is required".to_string(),
        ));
    }
    if len as u64 > MAX_BATCH_SIZE {
        return Err(AppError::Validation(format!(
            "At most {} items are allowed per request",
            MAX_BATCH_SIZE
        )));
    }
    Ok(())
}

/// Reject a batch that names the same key twice
pub fn ensure_unique<K, I>(keys: I) -> Result<()>
where
    K: Eq + Hash + std::fmt::Display,
    I: IntoIterator<Item = K>,
{
    let mut seen = HashSet::new();
    for key in keys {
        if seen.contains(&key) {
            return Err(AppError::Validation(format!("Duplicate id in request: {}", key)));
        }
        seen.insert(key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Validate)]
    struct Item {
        #[validate(range(min = 0))]
        display_order: i32,
    }

    #[test]
    fn test_validate_batch_rejects_empty() {
        let items: Vec<Item> = Vec::new();
        assert!(matches!(validate_batch(&items), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_batch_rejects_oversized() {
        assert!(ensure_batch_size(MAX_BATCH_SIZE as usize).is_ok());
        assert!(ensure_batch_size(MAX_BATCH_SIZE as usize + 1).is_err());
    }

    #[test]
    fn test_validate_batch_reports_item_index() {
        let items = vec![Item { display_order: 0 }, Item { display_order: -1 }];

        match validate_batch(&items) {
            Err(AppError::Validation(msg)) => assert!(msg.starts_with("item 1")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_unique() {
        let id = Uuid::now_v7();
        assert!(ensure_unique([id, Uuid::now_v7()]).is_ok());
        assert!(ensure_unique([id, id]).is_err());
    }
}
