// =============================================================================
// ORDERING
// =============================================================================

/// First `display_order` of the category sequence
pub const CATEGORY_ORDER_BASE: i32 = 0;

/// First `display_order` of each category's product sequence
pub const PRODUCT_ORDER_BASE: i32 = 0;

/// First `display_order` of the table sequence (tables are numbered from 1)
pub const TABLE_ORDER_BASE: i32 = 1;

// =============================================================================
// BATCHES
// =============================================================================

/// Maximum number of records accepted by one bulk, restore or reorder request
pub const MAX_BATCH_SIZE: u64 = 500;
