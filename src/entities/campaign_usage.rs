//! Campaign usage entity - One redemption of a campaign code.
//!
//! The thing the discount applied to is polymorphic (`applicable_type` +
//! `applicable_id`): an investment, a subscription or a payment.

use super::morph::MorphType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Campaign usage database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_usages")]
pub struct Model {
    /// Unique identifier for the campaign usage
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Campaign that was redeemed
    pub campaign_id: i64,
    /// User who redeemed it
    pub user_id: i64,
    /// Kind of row the discount applied to
    pub applicable_type: MorphType,
    /// Id of the row the discount applied to
    pub applicable_id: i64,
    /// Discount granted, in paise
    pub discount_paise: i64,
    /// Set once by `reverse`; a reversed usage no longer counts toward the cap
    pub reversed_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `CampaignUsage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each usage belongs to one campaign
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id"
    )]
    Campaign,
    /// Each usage belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl Model {
    /// Whether the discount has been taken back
    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reversed_at.is_some()
    }
}

impl ActiveModelBehavior for ActiveModel {}
