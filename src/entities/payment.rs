//! Payment entity - Money collected through a payment gateway.
//!
//! Amounts are integer paise; `currency` is carried for reporting even though the
//! platform settles in INR.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a payment
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Sent to the gateway, no callback yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Gateway confirmed the charge
    #[sea_orm(string_value = "captured")]
    Captured,
    /// Gateway declined the charge
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Charge returned to the payer
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Payer
    pub user_id: i64,
    /// Amount in paise
    pub amount_paise: i64,
    /// ISO 4217 code
    pub currency: String,
    /// Gateway name, e.g. "razorpay"
    pub gateway: String,
    /// Gateway-side reference, known once captured
    pub gateway_reference: Option<String>,
    /// Where the payment is in its lifecycle
    pub status: PaymentStatus,
    /// Gateway reason for a failed payment
    #[sea_orm(column_type = "Text", nullable)]
    pub failure_reason: Option<String>,
    /// When the gateway captured the charge
    pub paid_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one user
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

impl ActiveModelBehavior for ActiveModel {}
