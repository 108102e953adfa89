//! Denormalized counters maintained with atomic storage-level updates.
//!
//! A counter move is one `UPDATE t SET c = c + delta WHERE id = ?` statement. Run
//! it on the same transaction as the write that triggers it so both land or
//! neither does.

use crate::errors::{Error, Result};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::Expr};
use tracing::{debug, instrument};

/// Adds `delta` (negative to subtract) to `counter` on the row of `E` with
/// `id_column = id`.
///
/// Fails with [`Error::NotFound`] when no row matched.
#[instrument(skip(db))]
pub async fn adjust_counter<E, C>(
    db: &C,
    entity: &'static str,
    id_column: E::Column,
    id: i64,
    counter: E::Column,
    delta: i64,
) -> Result<()>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    if delta == 0 {
        return Ok(());
    }

    let result = E::update_many()
        .col_expr(counter, Expr::col(counter).add(delta))
        .filter(id_column.eq(id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::not_found(entity, id));
    }
    debug!(entity, id, delta, "Counter adjusted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{HelpArticle, help_article};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_adjust_counter_increments_and_decrements() -> Result<()> {
        let db = setup_test_db().await?;
        let article = create_test_article(&db, "Getting started").await?;

        adjust_counter::<HelpArticle, _>(
            &db,
            "help_article",
            help_article::Column::Id,
            article.id,
            help_article::Column::HelpfulCount,
            3,
        )
        .await?;
        adjust_counter::<HelpArticle, _>(
            &db,
            "help_article",
            help_article::Column::Id,
            article.id,
            help_article::Column::HelpfulCount,
            -1,
        )
        .await?;

        let reloaded = HelpArticle::find_by_id(article.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.helpful_count, 2);
        assert_eq!(reloaded.not_helpful_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_adjust_counter_missing_row() -> Result<()> {
        let db = setup_test_db().await?;
        let result = adjust_counter::<HelpArticle, _>(
            &db,
            "help_article",
            help_article::Column::Id,
            999,
            help_article::Column::HelpfulCount,
            1,
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "help_article",
                id: 999
            })
        ));
        Ok(())
    }
}
