pub mod dining_table;

pub use dining_table::{DiningTable, TABLE_COLUMNS};
