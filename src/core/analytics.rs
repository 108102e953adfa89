//! Raw product analytics events.
//!
//! Events are high-volume and short-lived: they are appended, counted and
//! pruned in bulk, never edited.

use crate::{
    core::{audit::RequestContext, guards},
    entities::{AnalyticsEvent, analytics_event},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Input for [`track_event`]
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Anonymous or logged-in browser session
    pub session_id: String,
    /// Dotted event name, e.g. `"deal.viewed"`
    pub event: String,
    /// Page the event fired on
    pub path: Option<String>,
    /// Free-form event payload
    pub properties: Json,
}

impl NewEvent {
    /// An event with no path and empty properties.
    #[must_use]
    pub fn new(session_id: &str, event: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            event: event.to_string(),
            path: None,
            properties: Json::Object(serde_json::Map::new()),
        }
    }
}

/// Stores an event with the caller's identity and client details.
pub async fn track_event(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    input: NewEvent,
) -> Result<analytics_event::Model> {
    guards::ensure_not_blank("session_id", &input.session_id)?;
    guards::ensure_not_blank("event", &input.event)?;

    let event = analytics_event::ActiveModel {
        user_id: Set(ctx.actor_id),
        session_id: Set(input.session_id),
        event: Set(input.event.trim().to_string()),
        path: Set(input.path),
        properties: Set(input.properties),
        ip_address: Set(ctx.ip_address.clone()),
        user_agent: Set(ctx.user_agent.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    debug!(event = %event.event, "Analytics event tracked");
    Ok(event)
}

/// Events in `[from, to)`, oldest first, optionally filtered by name.
pub async fn events_between(
    db: &DatabaseConnection,
    from: DateTimeUtc,
    to: DateTimeUtc,
    event: Option<&str>,
) -> Result<Vec<analytics_event::Model>> {
    let mut query = AnalyticsEvent::find()
        .filter(analytics_event::Column::CreatedAt.gte(from))
        .filter(analytics_event::Column::CreatedAt.lt(to));
    if let Some(event) = event {
        query = query.filter(analytics_event::Column::Event.eq(event));
    }
    query
        .order_by_asc(analytics_event::Column::CreatedAt)
        .order_by_asc(analytics_event::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of events with the given name.
pub async fn count_events(db: &DatabaseConnection, event: &str) -> Result<u64> {
    AnalyticsEvent::find()
        .filter(analytics_event::Column::Event.eq(event))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Deletes events older than `cutoff` and returns how many were removed.
pub async fn prune_events_before(db: &DatabaseConnection, cutoff: DateTimeUtc) -> Result<u64> {
    let result = AnalyticsEvent::delete_many()
        .filter(analytics_event::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;
    info!(removed = result.rows_affected, %cutoff, "Pruned analytics events");
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;
    use serde_json::json;

    #[tokio::test]
    async fn test_track_count_and_prune() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = RequestContext {
            actor_id: None,
            ip_address: Some("192.0.2.10".to_string()),
            user_agent: Some("curl/8.0".to_string()),
        };

        let mut viewed = NewEvent::new("sess-1", "deal.viewed");
        viewed.path = Some("/deals/seed-round".to_string());
        viewed.properties = json!({"deal_id": 1});
        let stored = track_event(&db, &ctx, viewed).await?;
        assert_eq!(stored.ip_address.as_deref(), Some("192.0.2.10"));
        assert_eq!(stored.properties["deal_id"], 1);

        track_event(&db, &ctx, NewEvent::new("sess-1", "deal.viewed")).await?;
        track_event(&db, &ctx, NewEvent::new("sess-2", "signup.started")).await?;
        assert!(track_event(&db, &ctx, NewEvent::new("", "deal.viewed")).await.is_err());

        assert_eq!(count_events(&db, "deal.viewed").await?, 2);

        let now = Utc::now();
        let window = events_between(&db, now - Duration::hours(1), now + Duration::hours(1), Some("deal.viewed")).await?;
        assert_eq!(window.len(), 2);
        assert!(events_between(&db, now + Duration::hours(1), now + Duration::hours(2), None).await?.is_empty());

        assert_eq!(prune_events_before(&db, now - Duration::days(1)).await?, 0);
        assert_eq!(prune_events_before(&db, now + Duration::minutes(1)).await?, 3);
        assert_eq!(count_events(&db, "deal.viewed").await?, 0);
        Ok(())
    }
}
