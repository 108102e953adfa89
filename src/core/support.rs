//! Support tickets and the message thread on each ticket.
//!
//! Each ticket caches how many messages each side has not read yet. Posting a
//! message bumps the other side's counter; marking messages read takes the
//! counter back down by the number of rows actually flipped.

use crate::{
    core::{
        audit::{self, RequestContext},
        counters, guards,
        morph::{MorphRef, MorphType},
    },
    entities::{
        SupportMessage, SupportTicket, User, support_message,
        support_ticket::{self, TicketPriority, TicketStatus},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde_json::json;
use tracing::{debug, info};

const TICKET: &str = "support_ticket";
const MESSAGE: &str = "support_message";

/// Which side of the conversation is reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reader {
    /// The customer who opened the ticket
    User,
    /// Support staff
    Staff,
}

impl Reader {
    const fn unread_column(self) -> support_ticket::Column {
        match self {
            Self::User => support_ticket::Column::UnreadByUser,
            Self::Staff => support_ticket::Column::UnreadByStaff,
        }
    }

    /// Messages this reader has to read are the ones the other side sent.
    const fn reads_staff_messages(self) -> bool {
        matches!(self, Self::User)
    }
}

async fn find_ticket<C>(db: &C, id: i64) -> Result<support_ticket::Model>
where
    C: ConnectionTrait,
{
    SupportTicket::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(TICKET, id))
}

async fn insert_message<C>(
    db: &C,
    ticket: &support_ticket::Model,
    sender_id: i64,
    is_staff: bool,
    body: &str,
    attachment_path: Option<String>,
) -> Result<support_message::Model>
where
    C: ConnectionTrait,
{
    guards::ensure_not_blank("body", body)?;
    let now = Utc::now();
    let message = support_message::ActiveModel {
        ticket_id: Set(ticket.id),
        sender_id: Set(sender_id),
        is_staff: Set(is_staff),
        body: Set(body.to_string()),
        attachment_path: Set(attachment_path),
        read_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let unread = if is_staff { Reader::User } else { Reader::Staff };
    counters::adjust_counter::<SupportTicket, _>(
        db,
        TICKET,
        support_ticket::Column::Id,
        ticket.id,
        unread.unread_column(),
        1,
    )
    .await?;
    Ok(message)
}

/// Opens a ticket with its first message from the customer.
pub async fn open_ticket(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    user_id: i64,
    subject: &str,
    body: &str,
    priority: TicketPriority,
) -> Result<support_ticket::Model> {
    guards::ensure_not_blank("subject", subject)?;
    guards::ensure_not_blank("body", body)?;

    let txn = db.begin().await?;
    let now = Utc::now();
    let ticket = support_ticket::ActiveModel {
        user_id: Set(user_id),
        assigned_to: Set(None),
        subject: Set(subject.trim().to_string()),
        status: Set(TicketStatus::Open),
        priority: Set(priority),
        unread_by_user: Set(0),
        unread_by_staff: Set(0),
        last_message_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    insert_message(&txn, &ticket, user_id, false, body, None).await?;
    audit::record_activity(
        &txn,
        ctx,
        "support_ticket.opened",
        Some(MorphRef::new(MorphType::SupportTicket, ticket.id)),
        json!({ "priority": priority }),
    )
    .await?;

    let ticket = find_ticket(&txn, ticket.id).await?;
    txn.commit().await?;
    info!(ticket_id = ticket.id, user_id, "Support ticket opened");
    Ok(ticket)
}

/// Adds a message to an open thread.
///
/// A staff reply moves an `open` ticket to `pending` (waiting on the customer);
/// a customer message moves a `pending` or `resolved` ticket back to `open`.
pub async fn post_message(
    db: &DatabaseConnection,
    ticket_id: i64,
    sender_id: i64,
    is_staff: bool,
    body: &str,
    attachment_path: Option<String>,
) -> Result<support_message::Model> {
    let txn = db.begin().await?;
    let ticket = find_ticket(&txn, ticket_id).await?;
    if ticket.is_closed() {
        return Err(Error::validation("status", "ticket is closed"));
    }

    let message = insert_message(&txn, &ticket, sender_id, is_staff, body, attachment_path).await?;

    let next_status = match (ticket.status, is_staff) {
        (TicketStatus::Open, true) => TicketStatus::Pending,
        (TicketStatus::Pending | TicketStatus::Resolved, false) => TicketStatus::Open,
        (status, _) => status,
    };
    // Only touch the columns this write owns; counters were moved atomically above
    SupportTicket::update_many()
        .col_expr(support_ticket::Column::Status, Expr::value(next_status))
        .col_expr(support_ticket::Column::LastMessageAt, Expr::value(message.created_at))
        .col_expr(support_ticket::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(support_ticket::Column::Id.eq(ticket_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    debug!(ticket_id, message_id = message.id, is_staff, "Support message posted");
    Ok(message)
}

/// Sets `read_at` only while it is still NULL. True when this call did it.
async fn stamp_read<C>(db: &C, message_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = SupportMessage::update_many()
        .col_expr(support_message::Column::ReadAt, Expr::value(Utc::now()))
        .filter(support_message::Column::Id.eq(message_id))
        .filter(support_message::Column::ReadAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Marks one message as read by its recipient.
pub async fn mark_message_as_read(db: &DatabaseConnection, message_id: i64) -> Result<support_message::Model> {
    let txn = db.begin().await?;
    let message = SupportMessage::find_by_id(message_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(MESSAGE, message_id))?;
    if message.read_at.is_some() {
        return Ok(message);
    }

    let reader = if message.is_staff { Reader::User } else { Reader::Staff };
    // Only the writer that flips read_at moves the counter
    if stamp_read(&txn, message_id).await? {
        counters::adjust_counter::<SupportTicket, _>(
            &txn,
            TICKET,
            support_ticket::Column::Id,
            message.ticket_id,
            reader.unread_column(),
            -1,
        )
        .await?;
    }
    let message = SupportMessage::find_by_id(message_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(MESSAGE, message_id))?;
    txn.commit().await?;
    Ok(message)
}

/// Marks every unread message for `reader` on a ticket as read.
///
/// Returns how many messages were flipped.
pub async fn mark_ticket_read(db: &DatabaseConnection, ticket_id: i64, reader: Reader) -> Result<u64> {
    let txn = db.begin().await?;
    find_ticket(&txn, ticket_id).await?;

    let result = SupportMessage::update_many()
        .col_expr(support_message::Column::ReadAt, Expr::value(Utc::now()))
        .filter(support_message::Column::TicketId.eq(ticket_id))
        .filter(support_message::Column::IsStaff.eq(reader.reads_staff_messages()))
        .filter(support_message::Column::ReadAt.is_null())
        .exec(&txn)
        .await?;

    let flipped = result.rows_affected;
    if flipped > 0 {
        let delta = i64::try_from(flipped)
            .map_err(|_| Error::validation("ticket_id", "too many messages to mark read"))?;
        counters::adjust_counter::<SupportTicket, _>(
            &txn,
            TICKET,
            support_ticket::Column::Id,
            ticket_id,
            reader.unread_column(),
            -delta,
        )
        .await?;
    }
    txn.commit().await?;
    Ok(flipped)
}

/// Assigns a ticket to a staff member. The assignee must be an admin.
pub async fn assign_ticket(db: &DatabaseConnection, ticket_id: i64, assignee_id: i64) -> Result<support_ticket::Model> {
    let ticket = find_ticket(db, ticket_id).await?;
    let assignee = User::find_by_id(assignee_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", assignee_id))?;
    if !assignee.is_admin() {
        return Err(Error::validation("assigned_to", "tickets can only be assigned to staff"));
    }

    let mut active: support_ticket::ActiveModel = ticket.into();
    active.assigned_to = Set(Some(assignee_id));
    active.updated_at = Set(Utc::now());
    let ticket = active.update(db).await?;
    info!(ticket_id, assignee_id, "Support ticket assigned");
    Ok(ticket)
}

/// Sets the status directly. Closed tickets stay closed.
pub async fn change_ticket_status(
    db: &DatabaseConnection,
    ticket_id: i64,
    status: TicketStatus,
) -> Result<support_ticket::Model> {
    let ticket = find_ticket(db, ticket_id).await?;
    if ticket.is_closed() && status != TicketStatus::Closed {
        return Err(Error::validation("status", "closed tickets cannot be reopened"));
    }
    let mut active: support_ticket::ActiveModel = ticket.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Tickets waiting on staff, most urgent first, then least recently active.
pub async fn open_tickets(db: &DatabaseConnection) -> Result<Vec<support_ticket::Model>> {
    let mut tickets = SupportTicket::find()
        .filter(support_ticket::Column::Status.eq(TicketStatus::Open))
        .order_by_asc(support_ticket::Column::LastMessageAt)
        .all(db)
        .await?;
    // Priority is stored as text, so rank it here
    tickets.sort_by_key(|t| std::cmp::Reverse(priority_rank(t.priority)));
    Ok(tickets)
}

const fn priority_rank(priority: TicketPriority) -> u8 {
    match priority {
        TicketPriority::Low => 0,
        TicketPriority::Normal => 1,
        TicketPriority::High => 2,
        TicketPriority::Urgent => 3,
    }
}

/// A user's tickets, newest first.
pub async fn tickets_for_user(db: &DatabaseConnection, user_id: i64) -> Result<Vec<support_ticket::Model>> {
    SupportTicket::find()
        .filter(support_ticket::Column::UserId.eq(user_id))
        .order_by_desc(support_ticket::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The message thread of a ticket, oldest first.
pub async fn messages_for_ticket(db: &DatabaseConnection, ticket_id: i64) -> Result<Vec<support_message::Model>> {
    SupportMessage::find()
        .filter(support_message::Column::TicketId.eq(ticket_id))
        .order_by_asc(support_message::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_unread_counters_follow_messages() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_user(&db, "customer@example.com").await?;
        let agent = create_test_admin(&db, "agent@example.com").await?;
        let ctx = RequestContext::for_user(customer.id);

        let ticket = open_ticket(&db, &ctx, customer.id, "Payout missing", "Where is my payout?", TicketPriority::High).await?;
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!((ticket.unread_by_user, ticket.unread_by_staff), (0, 1));

        post_message(&db, ticket.id, agent.id, true, "Looking into it", None).await?;
        let reply = post_message(&db, ticket.id, agent.id, true, "Found it", None).await?;
        let stored = find_ticket(&db, ticket.id).await?;
        assert_eq!(stored.status, TicketStatus::Pending);
        assert_eq!((stored.unread_by_user, stored.unread_by_staff), (2, 1));

        mark_message_as_read(&db, reply.id).await?;
        // Reading twice does not decrement again
        mark_message_as_read(&db, reply.id).await?;
        assert_eq!(find_ticket(&db, ticket.id).await?.unread_by_user, 1);

        assert_eq!(mark_ticket_read(&db, ticket.id, Reader::User).await?, 1);
        assert_eq!(mark_ticket_read(&db, ticket.id, Reader::Staff).await?, 1);
        assert_eq!(mark_ticket_read(&db, ticket.id, Reader::Staff).await?, 0);
        let stored = find_ticket(&db, ticket.id).await?;
        assert_eq!((stored.unread_by_user, stored.unread_by_staff), (0, 0));

        post_message(&db, ticket.id, customer.id, false, "Thanks!", None).await?;
        assert_eq!(find_ticket(&db, ticket.id).await?.status, TicketStatus::Open);
        assert_eq!(messages_for_ticket(&db, ticket.id).await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_message_already_stamped_keeps_counter() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_user(&db, "customer@example.com").await?;
        let agent = create_test_admin(&db, "agent@example.com").await?;
        let ticket = open_ticket(&db, &RequestContext::system(), customer.id, "KYC", "Stuck", TicketPriority::Normal).await?;
        let reply = post_message(&db, ticket.id, agent.id, true, "Retry now", None).await?;
        assert_eq!(find_ticket(&db, ticket.id).await?.unread_by_user, 1);

        assert!(stamp_read(&db, reply.id).await?);
        assert!(!stamp_read(&db, reply.id).await?);

        let message = mark_message_as_read(&db, reply.id).await?;
        assert!(message.read_at.is_some());
        // The stamp above bypassed the counter, so it stays where it was
        assert_eq!(find_ticket(&db, ticket.id).await?.unread_by_user, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_ticket_rejects_messages() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_user(&db, "customer@example.com").await?;
        let ticket = open_ticket(&db, &RequestContext::system(), customer.id, "Bug", "Broken", TicketPriority::Low).await?;

        change_ticket_status(&db, ticket.id, TicketStatus::Closed).await?;
        let result = post_message(&db, ticket.id, customer.id, false, "Hello?", None).await;
        assert!(matches!(result, Err(Error::Validation { field: "status", .. })));
        assert!(change_ticket_status(&db, ticket.id, TicketStatus::Open).await.is_err());
        assert_eq!(find_ticket(&db, ticket.id).await?.unread_by_staff, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_assignment_and_queue() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_user(&db, "customer@example.com").await?;
        let agent = create_test_admin(&db, "agent@example.com").await?;
        let ctx = RequestContext::system();

        let low = open_ticket(&db, &ctx, customer.id, "Question", "Hi", TicketPriority::Low).await?;
        let urgent = open_ticket(&db, &ctx, customer.id, "Fraud", "Help", TicketPriority::Urgent).await?;

        let queue: Vec<i64> = open_tickets(&db).await?.iter().map(|t| t.id).collect();
        assert_eq!(queue, vec![urgent.id, low.id]);

        let not_staff = assign_ticket(&db, low.id, customer.id).await;
        assert!(matches!(not_staff, Err(Error::Validation { field: "assigned_to", .. })));
        let assigned = assign_ticket(&db, low.id, agent.id).await?;
        assert_eq!(assigned.assigned_to, Some(agent.id));

        assert_eq!(tickets_for_user(&db, customer.id).await?.len(), 2);
        Ok(())
    }
}
