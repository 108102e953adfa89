//! Support ticket entity - A conversation between a user and the support team.
//!
//! `unread_by_user` and `unread_by_staff` are cached counters kept in step with
//! `support_messages.read_at` by `core::support`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a support ticket
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Waiting on staff
    #[sea_orm(string_value = "open")]
    Open,
    /// Waiting on the user
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Staff consider it solved
    #[sea_orm(string_value = "resolved")]
    Resolved,
    /// No further messages accepted
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// How urgently staff should respond
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    /// Low priority
    #[sea_orm(string_value = "low")]
    Low,
    /// Default priority
    #[sea_orm(string_value = "normal")]
    Normal,
    /// High priority
    #[sea_orm(string_value = "high")]
    High,
    /// Needs attention now
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

/// Support ticket database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "support_tickets")]
pub struct Model {
    /// Unique identifier for the ticket
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who opened the ticket
    pub user_id: i64,
    /// Staff member handling the ticket
    pub assigned_to: Option<i64>,
    /// Short summary
    pub subject: String,
    /// Where the ticket is in its lifecycle
    pub status: TicketStatus,
    /// Queue ordering priority
    pub priority: TicketPriority,
    /// Staff messages the user has not read yet
    pub unread_by_user: i32,
    /// User messages no staff member has read yet
    pub unread_by_staff: i32,
    /// When the latest message was posted
    pub last_message_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `SupportTicket` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each ticket is opened by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each ticket may be assigned to one staff member
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssignedTo",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Assignee,
    /// One ticket has many messages
    #[sea_orm(has_many = "super::support_message::Entity")]
    Messages,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::support_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl Model {
    /// Closed tickets accept no further messages.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == TicketStatus::Closed
    }
}

impl ActiveModelBehavior for ActiveModel {}
