//! Activity log - append-only record of who did what to which record.
//!
//! Entries are created through [`record_activity`]. [`update_activity_log`] and
//! [`delete_activity_log`] exist so that every write path goes through a guard;
//! both reject any change to an existing entry.

use crate::{
    core::{
        guards,
        morph::{AUDIT_SUBJECTS, MorphRef},
    },
    entities::{ActivityLog, activity_log},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

const ENTITY: &str = "activity_log";

/// Forensic details about the caller, supplied by the request layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated user performing the request, None for system jobs
    pub actor_id: Option<i64>,
    /// Client IP address
    pub ip_address: Option<String>,
    /// Client user agent string
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Context for work done by the platform itself.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            actor_id: None,
            ip_address: None,
            user_agent: None,
        }
    }

    /// Context for a signed-in user without request metadata.
    #[must_use]
    pub const fn for_user(actor_id: i64) -> Self {
        Self {
            actor_id: Some(actor_id),
            ip_address: None,
            user_agent: None,
        }
    }
}

/// Appends an entry to the activity log.
///
/// `action` is a dotted verb such as `"investment.confirmed"`. The optional
/// `subject` must be one of [`AUDIT_SUBJECTS`].
pub async fn record_activity<C>(
    db: &C,
    ctx: &RequestContext,
    action: &str,
    subject: Option<MorphRef>,
    properties: Json,
) -> Result<activity_log::Model>
where
    C: ConnectionTrait,
{
    guards::ensure_not_blank("action", action)?;
    if let Some(subject) = &subject {
        subject.ensure_accepted("subject", AUDIT_SUBJECTS)?;
    }

    let entry = activity_log::ActiveModel {
        actor_id: Set(ctx.actor_id),
        action: Set(action.trim().to_string()),
        subject_type: Set(subject.map(|s| s.kind)),
        subject_id: Set(subject.map(|s| s.id)),
        properties: Set(properties),
        ip_address: Set(ctx.ip_address.clone()),
        user_agent: Set(ctx.user_agent.clone()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let entry = entry.insert(db).await?;
    info!(id = entry.id, action = %entry.action, "Activity recorded");
    Ok(entry)
}

/// Entries about one record, newest first.
pub async fn activities_for_subject<C>(db: &C, subject: MorphRef) -> Result<Vec<activity_log::Model>>
where
    C: ConnectionTrait,
{
    ActivityLog::find()
        .filter(activity_log::Column::SubjectType.eq(subject.kind))
        .filter(activity_log::Column::SubjectId.eq(subject.id))
        .order_by_desc(activity_log::Column::CreatedAt)
        .order_by_desc(activity_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Entries performed by one user, newest first.
pub async fn activities_by_actor(db: &DatabaseConnection, actor_id: i64) -> Result<Vec<activity_log::Model>> {
    debug!(actor_id, "Loading activity by actor");
    ActivityLog::find()
        .filter(activity_log::Column::ActorId.eq(actor_id))
        .order_by_desc(activity_log::Column::CreatedAt)
        .order_by_desc(activity_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Guarded update path. No column of an existing entry may change, so this only
/// succeeds for a no-op and returns the stored entry.
pub async fn update_activity_log<C>(db: &C, entry: activity_log::ActiveModel) -> Result<activity_log::Model>
where
    C: ConnectionTrait,
{
    let id = guards::primary_key(&entry.id, ENTITY)?;
    let existing = ActivityLog::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))?;
    guards::ensure_only_columns(ENTITY, id, &guards::changed_columns(&entry), &[])?;
    Ok(existing)
}

/// Guarded delete path. Always fails for an existing entry.
pub async fn delete_activity_log<C>(db: &C, id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    ActivityLog::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))?;
    Err(guards::delete_rejected(ENTITY, id))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::morph::MorphType;
    use crate::test_utils::*;
    use serde_json::json;

    fn browser_context(actor_id: i64) -> RequestContext {
        RequestContext {
            actor_id: Some(actor_id),
            ip_address: Some("203.0.113.7".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        }
    }

    #[tokio::test]
    async fn test_record_activity_stores_forensic_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "auditor@example.com").await?;

        let entry = record_activity(
            &db,
            &browser_context(user.id),
            "user.login",
            Some(MorphRef::new(MorphType::User, user.id)),
            json!({"method": "password"}),
        )
        .await?;

        assert_eq!(entry.actor_id, Some(user.id));
        assert_eq!(entry.action, "user.login");
        assert_eq!(entry.subject_type, Some(MorphType::User));
        assert_eq!(entry.subject_id, Some(user.id));
        assert_eq!(entry.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(entry.properties["method"], "password");

        let found = activities_for_subject(&db, MorphRef::new(MorphType::User, user.id)).await?;
        assert_eq!(found.len(), 1);
        let by_actor = activities_by_actor(&db, user.id).await?;
        assert_eq!(by_actor.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_record_activity_rejects_blank_action() -> Result<()> {
        let db = setup_test_db().await?;
        let result = record_activity(&db, &RequestContext::system(), "  ", None, json!({})).await;
        assert!(matches!(result, Err(Error::Validation { field: "action", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_activity_log_is_immutable() -> Result<()> {
        let db = setup_test_db().await?;
        let entry = record_activity(&db, &RequestContext::system(), "deal.published", None, json!({})).await?;

        let mut active: activity_log::ActiveModel = entry.clone().into();
        active.action = Set("deal.closed".to_string());
        let result = update_activity_log(&db, active).await;
        assert!(matches!(
            result,
            Err(Error::ImmutableRecord { entity: "activity_log", ref operation, .. }) if operation.contains("action")
        ));

        // Untouched active model is a no-op, not an error
        let unchanged: activity_log::ActiveModel = entry.clone().into();
        let same = update_activity_log(&db, unchanged).await?;
        assert_eq!(same.id, entry.id);
        assert_eq!(same.action, "deal.published");

        let result = delete_activity_log(&db, entry.id).await;
        assert!(matches!(
            result,
            Err(Error::ImmutableRecord { entity: "activity_log", ref operation, .. }) if operation == "delete"
        ));

        let stored = ActivityLog::find_by_id(entry.id).one(&db).await?.unwrap();
        assert_eq!(stored.action, "deal.published");
        Ok(())
    }
}
