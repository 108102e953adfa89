//! Subscriptions, gateway payments and investor payouts.

use crate::{
    core::guards,
    entities::{
        Investment, Payment, Payout, Subscription,
        investment::InvestmentStatus,
        payment::{self, PaymentStatus},
        payout::{self, PayoutStatus},
        subscription::{self, SubscriptionStatus},
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Starts an active subscription. An end date must not come before the start.
pub async fn create_subscription(
    db: &DatabaseConnection,
    user_id: i64,
    plan_code: &str,
    amount_paise: i64,
    starts_on: NaiveDate,
    ends_on: Option<NaiveDate>,
) -> Result<subscription::Model> {
    guards::ensure_not_blank("plan_code", plan_code)?;
    guards::ensure_positive_paise("amount_paise", amount_paise)?;
    if let Some(ends_on) = ends_on {
        guards::ensure_date_order("ends_on", starts_on, ends_on)?;
    }

    let now = Utc::now();
    let subscription = subscription::ActiveModel {
        user_id: Set(user_id),
        plan_code: Set(plan_code.trim().to_string()),
        amount_paise: Set(amount_paise),
        status: Set(SubscriptionStatus::Active),
        starts_on: Set(starts_on),
        ends_on: Set(ends_on),
        cancelled_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(subscription_id = subscription.id, user_id, plan_code, "Subscription created");
    Ok(subscription)
}

/// Cancels an active subscription.
pub async fn cancel_subscription(db: &DatabaseConnection, id: i64) -> Result<subscription::Model> {
    let subscription = Subscription::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("subscription", id))?;
    if subscription.status != SubscriptionStatus::Active {
        return Err(Error::validation(
            "status",
            format!("subscription is already {:?}", subscription.status),
        ));
    }

    let mut active: subscription::ActiveModel = subscription.into();
    active.status = Set(SubscriptionStatus::Cancelled);
    active.cancelled_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// The user's subscription that covers `date`, latest start first.
pub async fn current_subscription(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
) -> Result<Option<subscription::Model>> {
    let subscriptions = Subscription::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .filter(subscription::Column::Status.eq(SubscriptionStatus::Active))
        .order_by_desc(subscription::Column::StartsOn)
        .all(db)
        .await?;
    Ok(subscriptions.into_iter().find(|s| s.is_current_on(date)))
}

/// Creates a pending INR payment for a gateway.
pub async fn create_payment(
    db: &DatabaseConnection,
    user_id: i64,
    amount_paise: i64,
    gateway: &str,
) -> Result<payment::Model> {
    guards::ensure_positive_paise("amount_paise", amount_paise)?;
    guards::ensure_not_blank("gateway", gateway)?;

    let now = Utc::now();
    payment::ActiveModel {
        user_id: Set(user_id),
        amount_paise: Set(amount_paise),
        currency: Set("INR".to_string()),
        gateway: Set(gateway.to_string()),
        gateway_reference: Set(None),
        status: Set(PaymentStatus::Pending),
        failure_reason: Set(None),
        paid_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn find_pending_payment(db: &DatabaseConnection, id: i64) -> Result<payment::Model> {
    let payment = Payment::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("payment", id))?;
    if payment.status != PaymentStatus::Pending {
        return Err(Error::validation(
            "status",
            format!("payment is already {:?}", payment.status),
        ));
    }
    Ok(payment)
}

/// Records a successful gateway callback.
pub async fn capture_payment(db: &DatabaseConnection, id: i64, gateway_reference: &str) -> Result<payment::Model> {
    guards::ensure_not_blank("gateway_reference", gateway_reference)?;
    let payment = find_pending_payment(db, id).await?;

    let mut active: payment::ActiveModel = payment.into();
    active.status = Set(PaymentStatus::Captured);
    active.gateway_reference = Set(Some(gateway_reference.to_string()));
    active.paid_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let payment = active.update(db).await?;
    info!(payment_id = id, gateway_reference, "Payment captured");
    Ok(payment)
}

/// Records a failed gateway callback with its reason.
pub async fn fail_payment(db: &DatabaseConnection, id: i64, reason: &str) -> Result<payment::Model> {
    let payment = find_pending_payment(db, id).await?;
    let mut active: payment::ActiveModel = payment.into();
    active.status = Set(PaymentStatus::Failed);
    active.failure_reason = Set(Some(reason.to_string()));
    active.updated_at = Set(Utc::now());
    let payment = active.update(db).await?;
    warn!(payment_id = id, reason, "Payment failed");
    Ok(payment)
}

/// Creates a pending payout for a confirmed investment.
///
/// Amount and tax must be non-negative and the tax cannot exceed the amount, so
/// [`payout::Model::net_amount`] is never negative.
pub async fn create_payout(
    db: &DatabaseConnection,
    investment_id: i64,
    amount: Decimal,
    tax_withheld: Decimal,
) -> Result<payout::Model> {
    guards::ensure_not_negative("amount", amount)?;
    guards::ensure_not_negative("tax_withheld", tax_withheld)?;
    if tax_withheld > amount {
        return Err(Error::validation(
            "tax_withheld",
            format!("{tax_withheld} exceeds the payout amount {amount}"),
        ));
    }

    let investment = Investment::find_by_id(investment_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("investment", investment_id))?;
    if investment.status != InvestmentStatus::Confirmed {
        return Err(Error::validation(
            "investment_id",
            "payouts require a confirmed investment",
        ));
    }

    let now = Utc::now();
    payout::ActiveModel {
        investment_id: Set(investment_id),
        user_id: Set(investment.user_id),
        amount: Set(amount),
        tax_withheld: Set(tax_withheld),
        status: Set(PayoutStatus::Pending),
        paid_on: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Marks a payout as paid on the given day. Paying twice is rejected.
pub async fn mark_payout_paid(db: &DatabaseConnection, id: i64, paid_on: NaiveDate) -> Result<payout::Model> {
    let payout = Payout::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("payout", id))?;
    if payout.status == PayoutStatus::Paid {
        return Err(Error::validation("status", "payout is already paid"));
    }

    let mut active: payout::ActiveModel = payout.into();
    active.status = Set(PayoutStatus::Paid);
    active.paid_on = Set(Some(paid_on));
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{audit::RequestContext, investment};
    use crate::test_utils::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "member@example.com").await?;

        let backwards = create_subscription(&db, user.id, "pro", 99_900, date(2025, 2, 1), Some(date(2025, 1, 1))).await;
        assert!(matches!(backwards, Err(Error::Validation { field: "ends_on", .. })));

        let sub = create_subscription(&db, user.id, "pro", 99_900, date(2025, 1, 1), Some(date(2025, 12, 31))).await?;
        assert_eq!(current_subscription(&db, user.id, date(2025, 6, 1)).await?.unwrap().id, sub.id);
        assert!(current_subscription(&db, user.id, date(2026, 1, 1)).await?.is_none());

        cancel_subscription(&db, sub.id).await?;
        assert!(current_subscription(&db, user.id, date(2025, 6, 1)).await?.is_none());
        assert!(cancel_subscription(&db, sub.id).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_capture_and_failure() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "payer@example.com").await?;

        let payment = create_payment(&db, user.id, 250_000, "razorpay").await?;
        let captured = capture_payment(&db, payment.id, "pay_123").await?;
        assert_eq!(captured.status, PaymentStatus::Captured);
        assert!(captured.paid_at.is_some());
        assert!(fail_payment(&db, payment.id, "late failure").await.is_err());

        let other = create_payment(&db, user.id, 10_000, "razorpay").await?;
        let failed = fail_payment(&db, other.id, "insufficient funds").await?;
        assert_eq!(failed.failure_reason.as_deref(), Some("insufficient funds"));

        assert!(create_payment(&db, user.id, 0, "razorpay").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_payout_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let investor = create_test_user(&db, "investor@example.com").await?;
        let owner = create_test_user(&db, "founder@example.com").await?;
        let company = create_test_company(&db, owner.id, "Payout Co").await?;
        let deal = create_test_deal(&db, company.id, "Seed").await?;
        let inv = investment::create_investment(&db, investor.id, deal.id, 1_000_000).await?;

        let unconfirmed = create_payout(&db, inv.id, Decimal::new(10_000, 2), Decimal::ZERO).await;
        assert!(matches!(unconfirmed, Err(Error::Validation { field: "investment_id", .. })));

        investment::confirm_investment(&db, &RequestContext::system(), inv.id).await?;

        let negative = create_payout(&db, inv.id, Decimal::new(-100, 2), Decimal::ZERO).await;
        assert!(matches!(negative, Err(Error::Validation { field: "amount", .. })));
        let over_taxed = create_payout(&db, inv.id, Decimal::new(100, 0), Decimal::new(150, 0)).await;
        assert!(matches!(over_taxed, Err(Error::Validation { field: "tax_withheld", .. })));

        let payout = create_payout(&db, inv.id, Decimal::new(100_050, 2), Decimal::new(10_025, 2)).await?;
        assert_eq!(payout.user_id, investor.id);
        assert_eq!(payout.net_amount(), Decimal::new(90_025, 2));

        let paid = mark_payout_paid(&db, payout.id, date(2025, 7, 1)).await?;
        assert_eq!(paid.status, PayoutStatus::Paid);
        assert!(mark_payout_paid(&db, payout.id, date(2025, 7, 2)).await.is_err());
        Ok(())
    }
}
