//! Company snapshot entity - A frozen copy of a company profile at a point in time.
//!
//! Snapshots are write-once. They have a `created_at` and deliberately no
//! `updated_at`; the write path in `core::company` rejects updates and deletes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Company snapshot database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "company_snapshots")]
pub struct Model {
    /// Unique identifier for the company snapshot
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company that was captured
    pub company_id: i64,
    /// Administrator or founder who triggered the capture, if any
    pub captured_by: Option<i64>,
    /// Why the snapshot was taken (e.g. "deal published")
    pub reason: String,
    /// Serialized company row plus document summary
    pub data: Json,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `CompanySnapshot` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each snapshot belongs to one company
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
