//! Help articles and the helpfulness feedback left on them.
//!
//! `helpful_count` and `not_helpful_count` are cached on the article. Every
//! feedback write goes through this module so the counters move in the same
//! transaction as the row:
//!
//! | write | counter move |
//! |---|---|
//! | create, helpful | `helpful_count + 1` |
//! | create, not helpful | `not_helpful_count + 1` |
//! | flip the vote | old bucket `- 1`, new bucket `+ 1` |
//! | edit comment only | none |
//! | delete | own bucket `- 1` |

use crate::{
    core::{counters, guards, slug},
    entities::{ArticleFeedback, HelpArticle, article_feedback, help_article},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info};

const ARTICLE: &str = "help_article";
const FEEDBACK: &str = "article_feedback";

const fn counter_for(is_helpful: bool) -> help_article::Column {
    if is_helpful {
        help_article::Column::HelpfulCount
    } else {
        help_article::Column::NotHelpfulCount
    }
}

async fn move_counter<C>(db: &C, article_id: i64, is_helpful: bool, delta: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    counters::adjust_counter::<HelpArticle, _>(
        db,
        ARTICLE,
        help_article::Column::Id,
        article_id,
        counter_for(is_helpful),
        delta,
    )
    .await
}

/// Creates an unpublished article with a unique slug.
pub async fn create_article(
    db: &DatabaseConnection,
    title: &str,
    body: &str,
    category: Option<String>,
) -> Result<help_article::Model> {
    guards::ensure_not_blank("title", title)?;
    let slug = slug::unique_slug::<HelpArticle, _>(db, help_article::Column::Slug, &slug::slugify(title)).await?;

    let now = Utc::now();
    let article = help_article::ActiveModel {
        title: Set(title.trim().to_string()),
        slug: Set(slug),
        body: Set(body.to_string()),
        category: Set(category),
        is_published: Set(false),
        helpful_count: Set(0),
        not_helpful_count: Set(0),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(article_id = article.id, slug = %article.slug, "Help article created");
    Ok(article)
}

/// Makes an article visible in [`published_articles`].
pub async fn publish_article(db: &DatabaseConnection, id: i64) -> Result<help_article::Model> {
    let article = HelpArticle::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ARTICLE, id))?;
    let mut active: help_article::ActiveModel = article.into();
    active.is_published = Set(true);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Published, non-deleted articles, optionally limited to one category.
pub async fn published_articles(
    db: &DatabaseConnection,
    category: Option<&str>,
) -> Result<Vec<help_article::Model>> {
    let mut query = HelpArticle::find()
        .filter(help_article::Column::IsPublished.eq(true))
        .filter(help_article::Column::IsDeleted.eq(false));
    if let Some(category) = category {
        query = query.filter(help_article::Column::Category.eq(category));
    }
    query
        .order_by_asc(help_article::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores a rating and bumps the matching counter.
pub async fn submit_feedback(
    db: &DatabaseConnection,
    article_id: i64,
    user_id: Option<i64>,
    is_helpful: bool,
    comment: Option<String>,
) -> Result<article_feedback::Model> {
    let txn = db.begin().await?;
    let now = Utc::now();
    let feedback = article_feedback::ActiveModel {
        help_article_id: Set(article_id),
        user_id: Set(user_id),
        is_helpful: Set(is_helpful),
        comment: Set(comment),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    move_counter(&txn, article_id, is_helpful, 1).await?;
    txn.commit().await?;
    debug!(article_id, is_helpful, "Feedback submitted");
    Ok(feedback)
}

/// Edits a rating. Counters only move when `is_helpful` flips.
pub async fn change_feedback(
    db: &DatabaseConnection,
    id: i64,
    is_helpful: bool,
    comment: Option<String>,
) -> Result<article_feedback::Model> {
    let txn = db.begin().await?;
    let feedback = ArticleFeedback::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(FEEDBACK, id))?;
    let article_id = feedback.help_article_id;

    if flip_vote(&txn, id, is_helpful).await? {
        move_counter(&txn, article_id, !is_helpful, -1).await?;
        move_counter(&txn, article_id, is_helpful, 1).await?;
    }

    let mut active: article_feedback::ActiveModel = feedback.into();
    active.is_helpful = Set(is_helpful);
    active.comment = Set(comment);
    active.updated_at = Set(Utc::now());
    let feedback = active.update(&txn).await?;
    txn.commit().await?;
    Ok(feedback)
}

/// Sets `is_helpful` only if the stored vote is the opposite. True when this
/// call flipped it.
async fn flip_vote<C>(db: &C, id: i64, is_helpful: bool) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = ArticleFeedback::update_many()
        .col_expr(article_feedback::Column::IsHelpful, Expr::value(is_helpful))
        .filter(article_feedback::Column::Id.eq(id))
        .filter(article_feedback::Column::IsHelpful.eq(!is_helpful))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Removes a rating and takes its vote back out of the counters.
///
/// The row is deleted per vote bucket so the bucket that goes down is the one
/// the deleted row was actually in.
pub async fn delete_feedback(db: &DatabaseConnection, id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let feedback = ArticleFeedback::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(FEEDBACK, id))?;

    for is_helpful in [feedback.is_helpful, !feedback.is_helpful] {
        let deleted = ArticleFeedback::delete_many()
            .filter(article_feedback::Column::Id.eq(id))
            .filter(article_feedback::Column::IsHelpful.eq(is_helpful))
            .exec(&txn)
            .await?;
        if deleted.rows_affected == 1 {
            move_counter(&txn, feedback.help_article_id, is_helpful, -1).await?;
            txn.commit().await?;
            return Ok(());
        }
    }
    // Deleted by another writer
    Err(Error::not_found(FEEDBACK, id))
}
