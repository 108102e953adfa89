//! KYC record entity - One identity verification attempt for a user.
//!
//! The record is the aggregate root for the uploaded documents.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review state of a KYC record
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    /// Created, documents still being collected
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Submitted and waiting for staff
    #[sea_orm(string_value = "under_review")]
    UnderReview,
    /// Identity verified
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Verification refused
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// KYC record database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kyc_records")]
pub struct Model {
    /// Unique identifier for the kyc record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User being verified
    pub user_id: i64,
    /// Where verification stands
    pub status: KycStatus,
    /// Permanent account number as declared by the user
    pub pan_number: Option<String>,
    /// Why the reviewer rejected the record
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    /// Administrator who approved or rejected the record
    pub reviewed_by: Option<i64>,
    /// When the user submitted for review
    pub submitted_at: Option<DateTimeUtc>,
    /// When the record was approved
    pub verified_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `KycRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// One record has many documents
    #[sea_orm(has_many = "super::kyc_document::Entity")]
    Documents,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::kyc_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
