//! User entity - Investors, founders and platform administrators.
//!
//! Users are soft-deleted so that investments, signatures and audit trails that
//! reference them stay resolvable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role a user holds on the platform
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Invests in deals
    #[sea_orm(string_value = "investor")]
    Investor,
    /// Owns companies and raises rounds
    #[sea_orm(string_value = "founder")]
    Founder,
    /// Platform staff
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email, unique across the platform
    #[sea_orm(unique)]
    pub email: String,
    /// Contact phone number, if provided
    pub phone: Option<String>,
    /// Platform role
    pub role: UserRole,
    /// Code other users enter to be attributed to this user as referrer
    #[sea_orm(unique)]
    pub referral_code: String,
    /// User who referred this one, if any
    pub referred_by: Option<i64>,
    /// Inactive users cannot log in but keep their data
    pub is_active: bool,
    /// Soft delete flag - if true, user is hidden but data is preserved
    pub is_deleted: bool,
    /// When the email address was confirmed
    pub email_verified_at: Option<DateTimeUtc>,
    /// When the user was created
    pub created_at: DateTimeUtc,
    /// When the user was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The user who referred this user
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ReferredBy",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Referrer,
    /// One user has many KYC records (one per verification attempt)
    #[sea_orm(has_many = "super::kyc_record::Entity")]
    KycRecords,
    /// Companies owned by this user
    #[sea_orm(has_many = "super::company::Entity")]
    Companies,
    /// Investments made by this user
    #[sea_orm(has_many = "super::investment::Entity")]
    Investments,
    /// Notifications addressed to this user
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
    /// Support tickets opened by this user
    #[sea_orm(has_many = "super::support_ticket::Entity")]
    SupportTickets,
    /// Legal agreements signed by this user
    #[sea_orm(has_many = "super::user_agreement_signature::Entity")]
    Signatures,
}

impl Related<super::kyc_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::KycRecords.def()
    }
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::investment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Investments.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl Related<super::support_ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupportTickets.def()
    }
}

impl Related<super::user_agreement_signature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signatures.def()
    }
}

impl Model {
    /// Whether the user administers the platform.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether the email address has been confirmed.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

impl ActiveModelBehavior for ActiveModel {}
