//! Referral campaign entity - A time-boxed programme paying bonuses for referrals.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Referral campaign database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_campaigns")]
pub struct Model {
    /// Unique identifier for the campaign
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// URL-safe identifier derived from the name
    #[sea_orm(unique)]
    pub slug: String,
    /// Bonus credited to the referrer per rewarded referral
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub bonus_amount: Decimal,
    /// Bonus credited to the referred user
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub referee_bonus_amount: Decimal,
    /// First day referrals count toward this campaign
    pub start_date: Date,
    /// Last day referrals count toward this campaign
    pub end_date: Date,
    /// Optional cap on referrals each referrer may record in this campaign
    pub max_referrals_per_user: Option<i32>,
    /// Switched-off campaigns take no referrals
    pub is_active: bool,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `ReferralCampaign` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One campaign has many referrals
    #[sea_orm(has_many = "super::referral::Entity")]
    Referrals,
    /// One campaign has many contest entries
    #[sea_orm(has_many = "super::contest_entry::Entity")]
    ContestEntries,
}

impl Related<super::referral::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Referrals.def()
    }
}

impl Related<super::contest_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContestEntries.def()
    }
}

impl Model {
    /// Whether the campaign accepts referrals on `date`.
    #[must_use]
    pub fn is_running_on(&self, date: Date) -> bool {
        self.is_active && self.start_date <= date && date <= self.end_date
    }
}

impl ActiveModelBehavior for ActiveModel {}
