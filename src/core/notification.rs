//! In-app notifications.

use crate::{
    core::guards,
    entities::{Notification, notification},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::debug;

const ENTITY: &str = "notification";

/// Stores an unread notification for a user.
pub async fn notify(
    db: &DatabaseConnection,
    user_id: i64,
    kind: &str,
    title: &str,
    data: Json,
) -> Result<notification::Model> {
    guards::ensure_not_blank("kind", kind)?;
    guards::ensure_not_blank("title", title)?;

    let notification = notification::ActiveModel {
        user_id: Set(user_id),
        kind: Set(kind.to_string()),
        title: Set(title.trim().to_string()),
        data: Set(data),
        read_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    debug!(user_id, kind, "Notification sent");
    Ok(notification)
}

/// Marks one notification as read. Already-read notifications keep their first
/// read time.
pub async fn mark_as_read(db: &DatabaseConnection, id: i64) -> Result<notification::Model> {
    let notification = Notification::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))?;
    if notification.is_read() {
        return Ok(notification);
    }
    let mut active: notification::ActiveModel = notification.into();
    active.read_at = Set(Some(Utc::now()));
    active.update(db).await.map_err(Into::into)
}

/// Marks all of a user's unread notifications as read and returns how many changed.
pub async fn mark_all_as_read(db: &DatabaseConnection, user_id: i64) -> Result<u64> {
    let result = Notification::update_many()
        .col_expr(notification::Column::ReadAt, Expr::value(Utc::now()))
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::ReadAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Unread notifications, newest first.
pub async fn unread_notifications(db: &DatabaseConnection, user_id: i64) -> Result<Vec<notification::Model>> {
    Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::ReadAt.is_null())
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_tracking() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "investor@example.com").await?;
        let other = create_test_user(&db, "other@example.com").await?;

        let first = notify(&db, user.id, "deal.live", "A new deal is live", json!({"deal_id": 3})).await?;
        notify(&db, user.id, "payout.paid", "Payout sent", json!({})).await?;
        notify(&db, other.id, "payout.paid", "Payout sent", json!({})).await?;
        assert!(!first.is_read());

        let read = mark_as_read(&db, first.id).await?;
        assert!(read.is_read());
        let stored = Notification::find_by_id(first.id).one(&db).await?.unwrap();
        let again = mark_as_read(&db, first.id).await?;
        assert_eq!(again.read_at, stored.read_at);

        let unread = unread_notifications(&db, user.id).await?;
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, "payout.paid");

        assert_eq!(mark_all_as_read(&db, user.id).await?, 1);
        assert_eq!(mark_all_as_read(&db, user.id).await?, 0);
        assert_eq!(unread_notifications(&db, other.id).await?.len(), 1);
        Ok(())
    }
}
