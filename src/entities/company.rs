//! Company entity - A business raising money on the platform.
//!
//! The slug is derived from the name unless an administrator pinned it
//! manually, which is tracked by `slug_locked`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Company database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    /// Unique identifier for the company
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Founder account that manages the company profile
    pub owner_id: i64,
    /// Sector the company operates in
    pub sector_id: Option<i64>,
    /// Registered or trading name
    pub name: String,
    /// URL-safe identifier
    #[sea_orm(unique)]
    pub slug: String,
    /// True once the slug was set by hand; renames then keep it
    pub slug_locked: bool,
    /// Public description
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Company website
    pub website: Option<String>,
    /// Year of incorporation
    pub founded_year: Option<i32>,
    /// Set by an administrator after due diligence
    pub is_verified: bool,
    /// Soft delete flag - if true, company is hidden but data is preserved
    pub is_deleted: bool,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Company and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each company is owned by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    /// Each company may be classified under one sector
    #[sea_orm(
        belongs_to = "super::sector::Entity",
        from = "Column::SectorId",
        to = "super::sector::Column::Id"
    )]
    Sector,
    /// One company has many documents
    #[sea_orm(has_many = "super::company_document::Entity")]
    Documents,
    /// One company has many point-in-time snapshots
    #[sea_orm(has_many = "super::company_snapshot::Entity")]
    Snapshots,
    /// One company has many deals
    #[sea_orm(has_many = "super::deal::Entity")]
    Deals,
    /// One company has many corporate actions
    #[sea_orm(has_many = "super::corporate_action::Entity")]
    CorporateActions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::sector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sector.def()
    }
}

impl Related<super::company_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl Related<super::company_snapshot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl Related<super::deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deals.def()
    }
}

impl Related<super::corporate_action::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CorporateActions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
