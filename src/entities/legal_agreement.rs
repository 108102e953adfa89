//! Legal agreement entity - Versioned terms users must accept.
//!
//! Publishing a new version deactivates older versions of the same kind; the old
//! rows stay so existing signatures keep pointing at the text that was signed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kinds of agreement users sign
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum AgreementKind {
    /// Platform terms of service
    #[sea_orm(string_value = "terms_of_service")]
    TermsOfService,
    /// Privacy policy
    #[sea_orm(string_value = "privacy_policy")]
    PrivacyPolicy,
    /// Risk disclosure shown before investing
    #[sea_orm(string_value = "risk_disclosure")]
    RiskDisclosure,
    /// Investment agreement signed before investing
    #[sea_orm(string_value = "investment_agreement")]
    InvestmentAgreement,
}

/// Legal agreement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "legal_agreements")]
pub struct Model {
    /// Unique identifier for the legal agreement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Kind of agreement
    pub kind: AgreementKind,
    /// Title shown to the signer
    pub title: String,
    /// Derived from title and version, e.g. "terms-of-service-2-1"
    #[sea_orm(unique)]
    pub slug: String,
    /// Free-form version label, e.g. "2.1"
    pub version: String,
    /// Full agreement text
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// Only one version per kind is active at a time
    pub is_active: bool,
    /// Day the version takes effect
    pub effective_on: Date,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `LegalAgreement` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One agreement version has many signatures
    #[sea_orm(has_many = "super::user_agreement_signature::Entity")]
    Signatures,
}

impl Related<super::user_agreement_signature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signatures.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
