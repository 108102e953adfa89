//! Notification entity - In-app notifications shown in a user's inbox.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    /// Unique identifier for the notification
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipient
    pub user_id: i64,
    /// Machine-readable kind, e.g. "investment_confirmed"
    pub kind: String,
    /// Headline shown in the inbox
    pub title: String,
    /// Template variables for rendering
    pub data: Json,
    /// When the user first opened it
    pub read_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Notification and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each notification belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Model {
    /// Whether the user has opened the notification
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

impl ActiveModelBehavior for ActiveModel {}
