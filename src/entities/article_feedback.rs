//! Article feedback entity - A reader's "was this helpful?" vote on a help article.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Article feedback database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "article_feedback")]
pub struct Model {
    /// Unique identifier for the article feedback
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Article being rated
    pub help_article_id: i64,
    /// None for anonymous readers
    pub user_id: Option<i64>,
    /// Discriminant selecting which counter on the article this vote feeds
    pub is_helpful: bool,
    /// Optional free-text remark
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `ArticleFeedback` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each rating belongs to one article
    #[sea_orm(
        belongs_to = "super::help_article::Entity",
        from = "Column::HelpArticleId",
        to = "super::help_article::Column::Id",
        on_delete = "Cascade"
    )]
    Article,
    /// Each rating may come from a logged-in user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::help_article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
