//! Company document entity - Pitch decks, financials and filings attached to a company.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Company document database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "company_documents")]
pub struct Model {
    /// Unique identifier for the company document
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company the document belongs to
    pub company_id: i64,
    /// User who uploaded the document
    pub uploaded_by: i64,
    /// Display title
    pub title: String,
    /// Path of the file in the external file store
    pub file_path: String,
    /// Public documents are visible to prospective investors
    pub is_public: bool,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `CompanyDocument` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each document belongs to one company
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id",
        on_delete = "Cascade"
    )]
    Company,
    /// Each document was uploaded by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UploadedBy",
        to = "super::user::Column::Id"
    )]
    Uploader,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
