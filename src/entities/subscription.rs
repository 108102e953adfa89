//! Subscription entity - A paid membership plan held by a user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a subscription
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// In force
    #[sea_orm(string_value = "active")]
    Active,
    /// Stopped by the user
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Past its end date
    #[sea_orm(string_value = "expired")]
    Expired,
}

/// Subscription database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// Unique identifier for the subscription
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Subscriber
    pub user_id: i64,
    /// Plan identifier, e.g. "investor_pro_annual"
    pub plan_code: String,
    /// Price paid for the period, in paise
    pub amount_paise: i64,
    /// Where the subscription is in its lifecycle
    pub status: SubscriptionStatus,
    /// First day covered
    pub starts_on: Date,
    /// None for open-ended plans
    pub ends_on: Option<Date>,
    /// When the user cancelled
    pub cancelled_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Subscription and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each subscription belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Model {
    /// Whether the subscription grants access on `date`.
    #[must_use]
    pub fn is_current_on(&self, date: Date) -> bool {
        self.status == SubscriptionStatus::Active
            && self.starts_on <= date
            && self.ends_on.is_none_or(|ends_on| date <= ends_on)
    }
}

impl ActiveModelBehavior for ActiveModel {}
