//! Payout entity - Money returned to an investor (dividend, exit proceeds).
//!
//! `net_amount` is derived on read from `amount` and `tax_withheld`; it is never stored.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a payout
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Due, not yet paid
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Paid out
    #[sea_orm(string_value = "paid")]
    Paid,
}

/// Payout database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payouts")]
pub struct Model {
    /// Unique identifier for the payout
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Investment the payout comes from
    pub investment_id: i64,
    /// Recipient
    pub user_id: i64,
    /// Gross amount before tax
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount: Decimal,
    /// Tax deducted at source
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub tax_withheld: Decimal,
    /// Whether the payout has been paid
    pub status: PayoutStatus,
    /// Day the payout was paid
    pub paid_on: Option<Date>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Payout and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payout belongs to one investment
    #[sea_orm(
        belongs_to = "super::investment::Entity",
        from = "Column::InvestmentId",
        to = "super::investment::Column::Id"
    )]
    Investment,
    /// Each payout belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::investment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Investment.def()
    }
}

impl Model {
    /// Amount actually transferred: gross minus tax withheld.
    #[must_use]
    pub fn net_amount(&self) -> Decimal {
        self.amount - self.tax_withheld
    }
}

impl ActiveModelBehavior for ActiveModel {}
