//! Sector entity - Reference data classifying companies and deals.
//!
//! Sectors are hard-deleted, but only once nothing references them
//! (see `core::sector::delete_sector`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sector database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sectors")]
pub struct Model {
    /// Unique identifier for the sector
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Clean Energy")
    pub name: String,
    /// URL-safe identifier derived from the name
    #[sea_orm(unique)]
    pub slug: String,
    /// Optional longer description
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Inactive sectors are hidden from pickers but remain referenced
    pub is_active: bool,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Sector and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Companies classified under this sector
    #[sea_orm(has_many = "super::company::Entity")]
    Companies,
    /// Deals classified under this sector
    #[sea_orm(has_many = "super::deal::Entity")]
    Deals,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
