use std::fmt;

use uuid::Uuid;

use crate::shared::constants::{CATEGORY_ORDER_BASE, PRODUCT_ORDER_BASE, TABLE_ORDER_BASE};

/// The three ordered collections of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Categories,
    Products,
    Tables,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Categories => "categories",
            Collection::Products => "products",
            Collection::Tables => "dining_tables",
        }
    }

    /// Human readable name used in error messages
    pub fn label(self) -> &'static str {
        match self {
            Collection::Categories => "Category",
            Collection::Products => "Product",
            Collection::Tables => "Table",
        }
    }

    /// SQL expression yielding the scope key of a row
    pub(crate) fn scope_column(self) -> &'static str {
        match self {
            Collection::Products => "category_id",
            Collection::Categories | Collection::Tables => "NULL::uuid",
        }
    }

    /// Whether a live row with this `is_active` flag holds a place in its
    /// scope's sequence. Only products drop out while inactive.
    pub fn orders_member(self, is_active: bool) -> bool {
        self != Collection::Products || is_active
    }

    /// Resolve the scope a row belongs to from its scope key
    pub fn scope_of(self, category_id: Option<Uuid>) -> Option<Scope> {
        match self {
            Collection::Categories => Some(Scope::Categories),
            Collection::Tables => Some(Scope::Tables),
            Collection::Products => category_id.map(|category_id| Scope::Products { category_id }),
        }
    }
}

/// A group of records whose `display_order` values must stay contiguous.
///
/// Ordering of the variants is used to acquire scope locks deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Categories,
    Products { category_id: Uuid },
    Tables,
}

impl Scope {
    pub fn collection(&self) -> Collection {
        match self {
            Scope::Categories => Collection::Categories,
            Scope::Products { .. } => Collection::Products,
            Scope::Tables => Collection::Tables,
        }
    }

    /// First order value of the scope
    pub fn base(&self) -> i32 {
        match self {
            Scope::Categories => CATEGORY_ORDER_BASE,
            Scope::Products { .. } => PRODUCT_ORDER_BASE,
            Scope::Tables => TABLE_ORDER_BASE,
        }
    }

    /// Key hashed into a transaction-scoped advisory lock
    pub fn lock_key(&self) -> String {
        match self {
            Scope::Categories => "ordering:categories".to_string(),
            Scope::Products { category_id } => format!("ordering:products:{}", category_id),
            Scope::Tables => "ordering:dining_tables".to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Categories => write!(f, "categories"),
            Scope::Products { category_id } => write!(f, "products of category {}", category_id),
            Scope::Tables => write!(f, "tables"),
        }
    }
}
