//! Support message entity - One message in a support ticket thread.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Support message database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "support_messages")]
pub struct Model {
    /// Unique identifier for the support message
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Ticket the message is posted on
    pub ticket_id: i64,
    /// User who wrote it
    pub sender_id: i64,
    /// True when written by the support team, false when written by the ticket owner
    pub is_staff: bool,
    /// Message text
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// Stored path of an attached file
    pub attachment_path: Option<String>,
    /// When the other side read the message
    pub read_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `SupportMessage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each message belongs to one ticket
    #[sea_orm(
        belongs_to = "super::support_ticket::Entity",
        from = "Column::TicketId",
        to = "super::support_ticket::Column::Id",
        on_delete = "Cascade"
    )]
    Ticket,
    /// Each message has one sender
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id"
    )]
    Sender,
}

impl Related<super::support_ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
