use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a dining table
#[derive(Debug, Clone, FromRow)]
pub struct DiningTable {
    pub id: Uuid,
    pub name: String,
    pub display_order: i32,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const TABLE_COLUMNS: &str =
    "id, name, display_order, is_active, deleted_at, created_at, updated_at";
