//! Investment entity - A user's commitment to a deal.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an investment
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    /// Created, payment not yet confirmed
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Counted toward the deal's raised amount
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Withdrawn before confirmation
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Money returned after confirmation
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

/// Investment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "investments")]
pub struct Model {
    /// Unique identifier for the investment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Investor
    pub user_id: i64,
    /// Deal invested in
    pub deal_id: i64,
    /// Committed amount in paise
    pub amount_paise: i64,
    /// Where the investment is in its lifecycle
    pub status: InvestmentStatus,
    /// When the funds were confirmed received
    pub confirmed_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Investment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each investment belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each investment belongs to one deal
    #[sea_orm(
        belongs_to = "super::deal::Entity",
        from = "Column::DealId",
        to = "super::deal::Column::Id"
    )]
    Deal,
    /// One investment has many payouts
    #[sea_orm(has_many = "super::payout::Entity")]
    Payouts,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deal.def()
    }
}

impl Related<super::payout::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payouts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
