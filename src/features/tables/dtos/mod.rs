pub mod table_dto;

pub use table_dto::{CreateTableDto, RestoreTableItemDto, TableResponseDto, UpdateTableDto};
