//! Contest entry entity - A user's tickets in a referral campaign's prize draw.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contest entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contest_entries")]
pub struct Model {
    /// Unique identifier for the contest entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Entrant
    pub user_id: i64,
    /// Campaign whose contest this is
    pub referral_campaign_id: i64,
    /// Entries granted for joining
    pub base_entries: i32,
    /// Entries earned through rewarded referrals
    pub bonus_entries: i32,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `ContestEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each entry belongs to one referral campaign
    #[sea_orm(
        belongs_to = "super::referral_campaign::Entity",
        from = "Column::ReferralCampaignId",
        to = "super::referral_campaign::Column::Id"
    )]
    Campaign,
}

impl Related<super::referral_campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl Model {
    /// Entries that count in the draw.
    #[must_use]
    pub const fn total_entries(&self) -> i32 {
        self.base_entries + self.bonus_entries
    }
}

impl ActiveModelBehavior for ActiveModel {}
