pub mod categories;
pub mod menu;
pub mod ordering;
pub mod products;
pub mod tables;
