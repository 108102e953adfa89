//! Activity log entity - Append-only trail of who did what to which record.
//!
//! The subject is polymorphic (`subject_type` + `subject_id`) and optional for
//! actions that have no single target, such as a login.

use super::morph::MorphType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity log database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who performed the action, None for system actions
    pub actor_id: Option<i64>,
    /// Dotted action name, e.g. `"investment.confirmed"`
    pub action: String,
    /// Kind of the record acted on
    pub subject_type: Option<MorphType>,
    /// Id of the record acted on
    pub subject_id: Option<i64>,
    /// Free-form details (old/new values, amounts)
    pub properties: Json,
    /// Client IP the request came from
    pub ip_address: Option<String>,
    /// Client user agent
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ActivityLog` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry may name the user who acted
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ActorId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Actor,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
