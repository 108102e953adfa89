//! Discriminant for polymorphic ("belongs to one of several tables") columns.
//!
//! Rows that can point at more than one kind of entity store a `*_type` column
//! holding a [`MorphType`] next to a plain `*_id` column. Resolution back to a
//! concrete row lives in `core::morph`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Every entity kind that may appear on the target side of a polymorphic column
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MorphType {
    /// `users` table
    #[sea_orm(string_value = "user")]
    User,
    /// `companies` table
    #[sea_orm(string_value = "company")]
    Company,
    /// `deals` table
    #[sea_orm(string_value = "deal")]
    Deal,
    /// `investments` table
    #[sea_orm(string_value = "investment")]
    Investment,
    /// `subscriptions` table
    #[sea_orm(string_value = "subscription")]
    Subscription,
    /// `payments` table
    #[sea_orm(string_value = "payment")]
    Payment,
    /// `kyc_records` table
    #[sea_orm(string_value = "kyc_record")]
    KycRecord,
    /// `support_tickets` table
    #[sea_orm(string_value = "support_ticket")]
    SupportTicket,
    /// `legal_agreements` table
    #[sea_orm(string_value = "legal_agreement")]
    LegalAgreement,
}

impl MorphType {
    /// Stable name stored in the discriminant column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Company => "company",
            Self::Deal => "deal",
            Self::Investment => "investment",
            Self::Subscription => "subscription",
            Self::Payment => "payment",
            Self::KycRecord => "kyc_record",
            Self::SupportTicket => "support_ticket",
            Self::LegalAgreement => "legal_agreement",
        }
    }
}
