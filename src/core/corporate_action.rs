//! Corporate actions (dividends, bonus issues, splits, buybacks) on a company.
//!
//! An action is scheduled, then executed exactly once or cancelled.

use crate::{
    core::{
        audit::{self, RequestContext},
        guards,
        morph::{MorphRef, MorphType},
    },
    entities::{
        Company, CorporateAction,
        corporate_action::{self, ActionStatus, ActionType},
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::json;
use tracing::info;

const ENTITY: &str = "corporate_action";

/// Schedules a dividend, bonus issue, split or buyback for a company.
pub async fn schedule_action(
    db: &DatabaseConnection,
    company_id: i64,
    action_type: ActionType,
    record_date: NaiveDate,
    value_per_share: Decimal,
) -> Result<corporate_action::Model> {
    guards::ensure_not_negative("value_per_share", value_per_share)?;
    Company::find_by_id(company_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("company", company_id))?;

    let now = Utc::now();
    let action = corporate_action::ActiveModel {
        company_id: Set(company_id),
        action_type: Set(action_type),
        record_date: Set(record_date),
        value_per_share: Set(value_per_share),
        status: Set(ActionStatus::Scheduled),
        executed_at: Set(None),
        executed_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(action_id = action.id, company_id, ?action_type, "Corporate action scheduled");
    Ok(action)
}

async fn find_scheduled<C>(db: &C, id: i64, operation: &str) -> Result<corporate_action::Model>
where
    C: ConnectionTrait,
{
    let action = CorporateAction::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))?;
    if action.status != ActionStatus::Scheduled {
        return Err(Error::validation(
            "status",
            format!("cannot {operation} an action that is {:?}", action.status),
        ));
    }
    Ok(action)
}

/// Marks a scheduled action as executed and logs it against the company.
pub async fn execute(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    id: i64,
) -> Result<corporate_action::Model> {
    let txn = db.begin().await?;
    let action = find_scheduled(&txn, id, "execute").await?;

    let mut active: corporate_action::ActiveModel = action.into();
    active.status = Set(ActionStatus::Executed);
    active.executed_at = Set(Some(Utc::now()));
    active.executed_by = Set(ctx.actor_id);
    active.updated_at = Set(Utc::now());
    let action = active.update(&txn).await?;

    audit::record_activity(
        &txn,
        ctx,
        "corporate_action.executed",
        Some(MorphRef::new(MorphType::Company, action.company_id)),
        json!({
            "corporate_action_id": action.id,
            "action_type": action.action_type,
            "value_per_share": action.value_per_share.to_string(),
        }),
    )
    .await?;
    txn.commit().await?;
    info!(action_id = id, "Corporate action executed");
    Ok(action)
}

/// Cancels a scheduled action. Executed actions cannot be cancelled.
pub async fn cancel(db: &DatabaseConnection, id: i64) -> Result<corporate_action::Model> {
    let action = find_scheduled(db, id, "cancel").await?;
    let mut active: corporate_action::ActiveModel = action.into();
    active.status = Set(ActionStatus::Cancelled);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Actions for a company ordered by record date.
pub async fn actions_for_company(db: &DatabaseConnection, company_id: i64) -> Result<Vec<corporate_action::Model>> {
    CorporateAction::find()
        .filter(corporate_action::Column::CompanyId.eq(company_id))
        .order_by_asc(corporate_action::Column::RecordDate)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_execute_once() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_admin(&db, "ops@example.com").await?;
        let owner = create_test_user(&db, "founder@example.com").await?;
        let company = create_test_company(&db, owner.id, "DivCo").await?;
        let record_date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();

        let action = schedule_action(&db, company.id, ActionType::Dividend, record_date, Decimal::new(250, 2)).await?;
        assert_eq!(action.status, ActionStatus::Scheduled);

        let ctx = RequestContext::for_user(admin.id);
        let executed = execute(&db, &ctx, action.id).await?;
        assert_eq!(executed.status, ActionStatus::Executed);
        assert_eq!(executed.executed_by, Some(admin.id));
        assert!(executed.executed_at.is_some());

        let again = execute(&db, &ctx, action.id).await;
        assert!(matches!(again, Err(Error::Validation { field: "status", .. })));
        assert!(matches!(cancel(&db, action.id).await, Err(Error::Validation { .. })));

        let trail = audit::activities_for_subject(&db, MorphRef::new(MorphType::Company, company.id)).await?;
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, "corporate_action.executed");
        Ok(())
    }

    #[tokio::test]
    async fn test_schedule_validation_and_cancel() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "founder@example.com").await?;
        let company = create_test_company(&db, owner.id, "SplitCo").await?;
        let record_date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();

        let negative = schedule_action(&db, company.id, ActionType::Buyback, record_date, Decimal::new(-1, 0)).await;
        assert!(matches!(negative, Err(Error::Validation { field: "value_per_share", .. })));

        let missing = schedule_action(&db, 999, ActionType::Split, record_date, Decimal::ZERO).await;
        assert!(matches!(missing, Err(Error::NotFound { entity: "company", .. })));

        let action = schedule_action(&db, company.id, ActionType::Split, record_date, Decimal::ZERO).await?;
        let cancelled = cancel(&db, action.id).await?;
        assert_eq!(cancelled.status, ActionStatus::Cancelled);
        assert_eq!(actions_for_company(&db, company.id).await?.len(), 1);
        Ok(())
    }
}
