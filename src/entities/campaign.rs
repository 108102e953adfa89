//! Campaign entity - Promo codes giving discounts on investments, subscriptions or payments.
//!
//! `usage_count` is a cached counter moved atomically by `core::campaign::redeem`
//! and `core::campaign::reverse`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How `discount_value` is interpreted
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Percentage of the order value, 0-100
    #[sea_orm(string_value = "percent")]
    Percent,
    /// Fixed amount in rupees
    #[sea_orm(string_value = "flat")]
    Flat,
}

/// Campaign database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    /// Unique identifier for the campaign
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Code typed in by users, stored upper-case
    #[sea_orm(unique)]
    pub code: String,
    /// Internal label
    pub name: String,
    /// How `discount_value` is applied
    pub discount_type: DiscountType,
    /// Percentage (0-100) or flat amount in rupees
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub discount_value: Decimal,
    /// Redemption cap across all users, None for unlimited
    pub max_uses: Option<i32>,
    /// Number of live (not reversed) redemptions
    pub usage_count: i32,
    /// Redeemable from this instant
    pub starts_at: DateTimeUtc,
    /// Redeemable until this instant
    pub ends_at: DateTimeUtc,
    /// Switched-off campaigns cannot be redeemed
    pub is_active: bool,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Campaign and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One campaign has many usages
    #[sea_orm(has_many = "super::campaign_usage::Entity")]
    Usages,
}

impl Related<super::campaign_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usages.def()
    }
}

impl Model {
    /// Whether the code can be redeemed at `now`, ignoring per-user rules.
    #[must_use]
    pub fn is_redeemable_at(&self, now: DateTimeUtc) -> bool {
        self.is_active
            && self.starts_at <= now
            && now <= self.ends_at
            && self.max_uses.is_none_or(|max| self.usage_count < max)
    }
}

impl ActiveModelBehavior for ActiveModel {}
