//! Investments into deals.
//!
//! `pending -> confirmed -> refunded`, or `pending -> cancelled`. Confirming and
//! refunding move the deal's cached `raised_amount_paise` in the same transaction.

use crate::{
    core::{
        audit::{self, RequestContext},
        counters, guards,
        morph::{MorphRef, MorphType},
    },
    entities::{
        Deal, Investment, deal,
        investment::{self, InvestmentStatus},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::json;
use tracing::{info, instrument};

const ENTITY: &str = "investment";

async fn find_investment<C>(db: &C, id: i64) -> Result<investment::Model>
where
    C: ConnectionTrait,
{
    Investment::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))
}

fn ensure_status(investment: &investment::Model, expected: InvestmentStatus, operation: &str) -> Result<()> {
    if investment.status != expected {
        return Err(Error::validation(
            "status",
            format!("cannot {operation} an investment that is {:?}", investment.status),
        ));
    }
    Ok(())
}

/// Creates a pending investment in a deal that is open today.
pub async fn create_investment(
    db: &DatabaseConnection,
    user_id: i64,
    deal_id: i64,
    amount_paise: i64,
) -> Result<investment::Model> {
    guards::ensure_positive_paise("amount_paise", amount_paise)?;
    let deal = Deal::find_by_id(deal_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("deal", deal_id))?;

    if !deal.is_open_on(Utc::now().date_naive()) {
        return Err(Error::validation("deal_id", "deal is not open for investment"));
    }
    if amount_paise < deal.min_investment_paise {
        return Err(Error::validation(
            "amount_paise",
            format!("minimum investment is {} paise", deal.min_investment_paise),
        ));
    }

    let now = Utc::now();
    let investment = investment::ActiveModel {
        user_id: Set(user_id),
        deal_id: Set(deal_id),
        amount_paise: Set(amount_paise),
        status: Set(InvestmentStatus::Pending),
        confirmed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(investment_id = investment.id, deal_id, amount_paise, "Investment created");
    Ok(investment)
}

/// Confirms a pending investment and adds it to the deal's raised amount.
#[instrument(skip(db, ctx))]
pub async fn confirm_investment(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    id: i64,
) -> Result<investment::Model> {
    let txn = db.begin().await?;
    let investment = find_investment(&txn, id).await?;
    ensure_status(&investment, InvestmentStatus::Pending, "confirm")?;

    let mut active: investment::ActiveModel = investment.into();
    active.status = Set(InvestmentStatus::Confirmed);
    active.confirmed_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let investment = active.update(&txn).await?;

    counters::adjust_counter::<Deal, _>(
        &txn,
        "deal",
        deal::Column::Id,
        investment.deal_id,
        deal::Column::RaisedAmountPaise,
        investment.amount_paise,
    )
    .await?;
    audit::record_activity(
        &txn,
        ctx,
        "investment.confirmed",
        Some(MorphRef::new(MorphType::Investment, id)),
        json!({ "deal_id": investment.deal_id, "amount_paise": investment.amount_paise }),
    )
    .await?;

    txn.commit().await?;
    Ok(investment)
}

/// Cancels a pending investment. Nothing was counted yet, so no counter moves.
pub async fn cancel_investment(db: &DatabaseConnection, id: i64) -> Result<investment::Model> {
    let investment = find_investment(db, id).await?;
    ensure_status(&investment, InvestmentStatus::Pending, "cancel")?;
    let mut active: investment::ActiveModel = investment.into();
    active.status = Set(InvestmentStatus::Cancelled);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Refunds a confirmed investment and removes it from the deal's raised amount.
#[instrument(skip(db, ctx))]
pub async fn refund_investment(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    id: i64,
) -> Result<investment::Model> {
    let txn = db.begin().await?;
    let investment = find_investment(&txn, id).await?;
    ensure_status(&investment, InvestmentStatus::Confirmed, "refund")?;

    let mut active: investment::ActiveModel = investment.into();
    active.status = Set(InvestmentStatus::Refunded);
    active.updated_at = Set(Utc::now());
    let investment = active.update(&txn).await?;

    counters::adjust_counter::<Deal, _>(
        &txn,
        "deal",
        deal::Column::Id,
        investment.deal_id,
        deal::Column::RaisedAmountPaise,
        -investment.amount_paise,
    )
    .await?;
    audit::record_activity(
        &txn,
        ctx,
        "investment.refunded",
        Some(MorphRef::new(MorphType::Investment, id)),
        json!({ "deal_id": investment.deal_id, "amount_paise": investment.amount_paise }),
    )
    .await?;

    txn.commit().await?;
    Ok(investment)
}

/// A user's investments, newest first.
pub async fn investments_for_user(db: &DatabaseConnection, user_id: i64) -> Result<Vec<investment::Model>> {
    Investment::find()
        .filter(investment::Column::UserId.eq(user_id))
        .order_by_desc(investment::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}
