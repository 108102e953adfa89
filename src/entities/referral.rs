//! Referral entity - Attribution of a new user (referee) to an existing one (referrer).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a referral
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    /// Referee signed up but has not met the qualifying condition
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Referee made a qualifying investment
    #[sea_orm(string_value = "qualified")]
    Qualified,
    /// Bonus credited to the referrer
    #[sea_orm(string_value = "rewarded")]
    Rewarded,
    /// Did not qualify
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Referral database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referrals")]
pub struct Model {
    /// Unique identifier for the referral
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who made the referral
    pub referrer_id: i64,
    /// A user can only be referred once
    #[sea_orm(unique)]
    pub referee_id: i64,
    /// Campaign the referral counts toward
    pub referral_campaign_id: Option<i64>,
    /// Where the referral is in its lifecycle
    pub status: ReferralStatus,
    /// Bonus paid to the referrer, copied from the campaign at reward time
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub reward_amount: Decimal,
    /// When the reward was paid
    pub rewarded_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Referral and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each referral has one referrer
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReferrerId",
        to = "super::user::Column::Id"
    )]
    Referrer,
    /// Each referral has one referee
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RefereeId",
        to = "super::user::Column::Id"
    )]
    Referee,
    /// Each referral may count toward one campaign
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

impl ActiveModelBehavior for ActiveModel {}
