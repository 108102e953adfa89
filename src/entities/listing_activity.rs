//! Listing activity entity - Timeline of what happened to a deal listing and who did it.
//!
//! The actor is polymorphic: a user, an administrator acting on behalf of the
//! platform, or the system itself (no id). See `core::deal::ListingActor`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discriminant for the actor column pair
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// A platform user
    #[sea_orm(string_value = "user")]
    User,
    /// Platform staff
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Automated job
    #[sea_orm(string_value = "system")]
    System,
}

/// Listing activity database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listing_activities")]
pub struct Model {
    /// Unique identifier for the listing activity
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Deal the entry is about
    pub deal_id: i64,
    /// Kind of actor
    pub actor_type: ActorType,
    /// User id for `user`/`admin` actors, None for `system`
    pub actor_id: Option<i64>,
    /// Short verb, e.g. "published", "closed"
    pub action: String,
    /// Free-form context for the action
    pub details: Json,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ListingActivity` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one deal
    #[sea_orm(
        belongs_to = "super::deal::Entity",
        from = "Column::DealId",
        to = "super::deal::Column::Id",
        on_delete = "Cascade"
    )]
    Deal,
}

impl Related<super::deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
