//! KYC document entity - A file uploaded as evidence for a KYC record.
//!
//! Only the storage path is kept here; the file itself lives in the external file store.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of identity evidence
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum KycDocumentType {
    /// Permanent account number card
    #[sea_orm(string_value = "pan_card")]
    PanCard,
    /// Aadhaar card
    #[sea_orm(string_value = "aadhaar")]
    Aadhaar,
    /// Passport
    #[sea_orm(string_value = "passport")]
    Passport,
    /// Recent bank statement
    #[sea_orm(string_value = "bank_statement")]
    BankStatement,
    /// Photograph of the applicant
    #[sea_orm(string_value = "photo")]
    Photo,
}

/// Review outcome of a single document
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Awaiting review
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Checked and accepted
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Checked and rejected
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// KYC document database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kyc_documents")]
pub struct Model {
    /// Unique identifier for the kyc document
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning KYC record
    pub kyc_record_id: i64,
    /// What the document is
    pub document_type: KycDocumentType,
    /// Path of the uploaded file in the file store
    pub file_path: String,
    /// User who uploaded the file (the applicant or an administrator)
    pub uploaded_by: i64,
    /// Review outcome
    pub status: DocumentStatus,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `KycDocument` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each document belongs to one KYC record
    #[sea_orm(
        belongs_to = "super::kyc_record::Entity",
        from = "Column::KycRecordId",
        to = "super::kyc_record::Column::Id",
        on_delete = "Cascade"
    )]
    KycRecord,
    /// Each document was uploaded by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UploadedBy",
        to = "super::user::Column::Id"
    )]
    Uploader,
}

impl Related<super::kyc_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::KycRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
