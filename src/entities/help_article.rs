//! Help article entity - Knowledge base pages with reader helpfulness counters.
//!
//! `helpful_count` and `not_helpful_count` are denormalized from
//! `article_feedback` and only ever moved through `core::feedback`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Help article database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "help_articles")]
pub struct Model {
    /// Unique identifier for the article
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Article title; the slug is derived from it
    pub title: String,
    /// URL-safe identifier derived from the title
    #[sea_orm(unique)]
    pub slug: String,
    /// Markdown body
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// Optional grouping, e.g. `"kyc"`
    pub category: Option<String>,
    /// Unpublished articles are drafts
    pub is_published: bool,
    /// Number of feedback rows with `is_helpful = true`
    pub helpful_count: i32,
    /// Number of feedback rows with `is_helpful = false`
    pub not_helpful_count: i32,
    /// Soft delete flag - if true, article is hidden but data is preserved
    pub is_deleted: bool,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `HelpArticle` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One article has many ratings
    #[sea_orm(has_many = "super::article_feedback::Entity")]
    Feedback,
}

impl Related<super::article_feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

impl Model {
    /// Share of helpful votes in percent, None before the first vote.
    #[must_use]
    pub fn helpfulness_ratio(&self) -> Option<f64> {
        let total = self.helpful_count + self.not_helpful_count;
        if total <= 0 {
            return None;
        }
        Some(f64::from(self.helpful_count) * 100.0 / f64::from(total))
    }
}

impl ActiveModelBehavior for ActiveModel {}
