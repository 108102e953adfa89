//! Feature flag entity - Switches with optional percentage rollout.
//!
//! The rollout rule itself lives in `core::feature_flag::is_enabled`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Feature flag database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feature_flags")]
pub struct Model {
    /// Unique identifier for the flag
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable key checked by application code (e.g., `"new_checkout"`)
    #[sea_orm(unique)]
    pub key: String,
    /// Human-readable name
    pub name: String,
    /// What the flag gates
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Master switch; false disables the flag for everyone
    pub active: bool,
    /// Share of signed-in users that see the feature, None for everyone
    pub percentage: Option<i32>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// `FeatureFlag` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
