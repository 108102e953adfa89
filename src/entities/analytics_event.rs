//! Analytics event entity - Raw product analytics (page views, clicks, funnel steps).
//!
//! Unlike the activity log these rows are disposable and pruned by age.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Analytics event database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analytics_events")]
pub struct Model {
    /// Unique identifier for the analytics event
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Signed-in user, None for anonymous visitors
    pub user_id: Option<i64>,
    /// Browser session the event belongs to
    pub session_id: String,
    /// Event name, e.g. `"page_view"`, `"deal_viewed"`
    pub event: String,
    /// Page the event fired on
    pub path: Option<String>,
    /// Free-form event payload
    pub properties: Json,
    /// Client IP
    pub ip_address: Option<String>,
    /// Client user agent
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// `AnalyticsEvent` keeps no foreign keys so anonymous and deleted users can be tracked
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
