pub mod table_handler;

pub use table_handler::*;
