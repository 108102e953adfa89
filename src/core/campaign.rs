//! Promotional discount campaigns and their usages.
//!
//! A usage applies a campaign to one investment, subscription or payment. The
//! campaign's `usage_count` is moved with a single conditional UPDATE so two
//! concurrent redemptions cannot push it past `max_uses`.

use crate::{
    core::{
        counters, guards,
        morph::{self, CAMPAIGN_APPLICABLE, MorphRecord, MorphRef},
    },
    entities::{
        Campaign, CampaignUsage,
        campaign::{self, DiscountType},
        campaign_usage,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

const ENTITY: &str = "campaign";
const USAGE: &str = "campaign_usage";

/// Input for [`create_campaign`]
#[derive(Debug, Clone)]
pub struct NewCampaign {
    /// Redemption code; stored upper-cased
    pub code: String,
    /// Internal label
    pub name: String,
    /// How `discount_value` is applied
    pub discount_type: DiscountType,
    /// Percent (0-100) or a flat amount in rupees
    pub discount_value: Decimal,
    /// Total redemptions allowed; `None` is unlimited
    pub max_uses: Option<i32>,
    /// Redeemable from this instant
    pub starts_at: DateTimeUtc,
    /// Redeemable until this instant
    pub ends_at: DateTimeUtc,
}

/// Creates an active campaign. Codes are unique ignoring case.
pub async fn create_campaign(db: &DatabaseConnection, input: NewCampaign) -> Result<campaign::Model> {
    guards::ensure_not_blank("code", &input.code)?;
    guards::ensure_not_blank("name", &input.name)?;
    guards::ensure_positive_decimal("discount_value", input.discount_value)?;
    if input.discount_type == DiscountType::Percent && input.discount_value > Decimal::ONE_HUNDRED {
        return Err(Error::validation("discount_value", "percent discount cannot exceed 100"));
    }
    if input.ends_at < input.starts_at {
        return Err(Error::validation("ends_at", "must not be before starts_at"));
    }
    if input.max_uses.is_some_and(|max_uses| max_uses <= 0) {
        return Err(Error::validation("max_uses", "must be greater than zero"));
    }

    let code = input.code.trim().to_uppercase();
    let taken = Campaign::find()
        .filter(campaign::Column::Code.eq(code.as_str()))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(Error::validation("code", format!("`{code}` is already in use")));
    }

    let now = Utc::now();
    let campaign = campaign::ActiveModel {
        code: Set(code),
        name: Set(input.name.trim().to_string()),
        discount_type: Set(input.discount_type),
        discount_value: Set(input.discount_value),
        max_uses: Set(input.max_uses),
        usage_count: Set(0),
        starts_at: Set(input.starts_at),
        ends_at: Set(input.ends_at),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(campaign_id = campaign.id, code = %campaign.code, "Campaign created");
    Ok(campaign)
}

/// Finds a campaign by code that can be redeemed right now.
pub async fn find_redeemable(db: &DatabaseConnection, code: &str) -> Result<Option<campaign::Model>> {
    let campaign = Campaign::find()
        .filter(campaign::Column::Code.eq(code.trim().to_uppercase()))
        .one(db)
        .await?;
    Ok(campaign.filter(|c| c.is_redeemable_at(Utc::now())))
}

/// Discount in paise for an amount, never more than the amount itself.
pub fn discount_for(campaign: &campaign::Model, amount_paise: i64) -> Result<i64> {
    let amount = Decimal::from(amount_paise);
    let discount = match campaign.discount_type {
        DiscountType::Percent => (amount * campaign.discount_value / Decimal::ONE_HUNDRED).floor(),
        DiscountType::Flat => campaign.discount_value * Decimal::ONE_HUNDRED,
    };
    let discount = discount
        .min(amount)
        .to_i64()
        .ok_or_else(|| Error::validation("discount_value", "discount does not fit in paise"))?;
    Ok(discount)
}

/// Applies a campaign to a target on behalf of a user.
///
/// Each user may hold one active (not reversed) usage per campaign. The usage
/// count increment is conditional on the cap, so the last slot is handed out
/// at most once.
#[instrument(skip(db))]
pub async fn redeem(
    db: &DatabaseConnection,
    code: &str,
    user_id: i64,
    applicable: MorphRef,
    amount_paise: i64,
) -> Result<campaign_usage::Model> {
    applicable.ensure_accepted("applicable_type", CAMPAIGN_APPLICABLE)?;
    guards::ensure_positive_paise("amount_paise", amount_paise)?;

    let txn = db.begin().await?;
    let campaign = Campaign::find()
        .filter(campaign::Column::Code.eq(code.trim().to_uppercase()))
        .one(&txn)
        .await?
        .filter(|c| c.is_redeemable_at(Utc::now()))
        .ok_or_else(|| Error::validation("code", format!("`{code}` is not redeemable")))?;

    morph::resolve_existing(&txn, applicable).await?;

    let already_used = CampaignUsage::find()
        .filter(campaign_usage::Column::CampaignId.eq(campaign.id))
        .filter(campaign_usage::Column::UserId.eq(user_id))
        .filter(campaign_usage::Column::ReversedAt.is_null())
        .count(&txn)
        .await?;
    if already_used > 0 {
        return Err(Error::validation("code", "campaign already used by this user"));
    }

    let claimed = Campaign::update_many()
        .col_expr(
            campaign::Column::UsageCount,
            Expr::col(campaign::Column::UsageCount).add(1),
        )
        .filter(campaign::Column::Id.eq(campaign.id))
        .filter(
            Condition::any()
                .add(campaign::Column::MaxUses.is_null())
                .add(Expr::col(campaign::Column::UsageCount).lt(Expr::col(campaign::Column::MaxUses))),
        )
        .exec(&txn)
        .await?;
    if claimed.rows_affected == 0 {
        return Err(Error::validation("code", "campaign has reached its usage limit"));
    }

    let usage = campaign_usage::ActiveModel {
        campaign_id: Set(campaign.id),
        user_id: Set(user_id),
        applicable_type: Set(applicable.kind),
        applicable_id: Set(applicable.id),
        discount_paise: Set(discount_for(&campaign, amount_paise)?),
        reversed_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(campaign_id = campaign.id, usage_id = usage.id, "Campaign redeemed");
    Ok(usage)
}

/// Undoes a usage once and gives the slot back to the campaign.
pub async fn reverse(db: &DatabaseConnection, usage_id: i64) -> Result<campaign_usage::Model> {
    let txn = db.begin().await?;
    let usage = CampaignUsage::find_by_id(usage_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(USAGE, usage_id))?;
    if usage.is_reversed() {
        return Err(Error::validation("reversed_at", "usage is already reversed"));
    }

    // A concurrent reversal may have landed since the read above
    if !mark_reversed(&txn, usage_id).await? {
        return Err(Error::validation("reversed_at", "usage is already reversed"));
    }
    let usage = CampaignUsage::find_by_id(usage_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(USAGE, usage_id))?;

    counters::adjust_counter::<Campaign, _>(
        &txn,
        ENTITY,
        campaign::Column::Id,
        usage.campaign_id,
        campaign::Column::UsageCount,
        -1,
    )
    .await?;
    txn.commit().await?;
    info!(usage_id, "Campaign usage reversed");
    Ok(usage)
}

/// Sets `reversed_at` only while it is still NULL. True when this call did it.
async fn mark_reversed<C>(db: &C, usage_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = CampaignUsage::update_many()
        .col_expr(campaign_usage::Column::ReversedAt, Expr::value(Utc::now()))
        .filter(campaign_usage::Column::Id.eq(usage_id))
        .filter(campaign_usage::Column::ReversedAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Loads the investment, subscription or payment a usage applies to.
pub async fn resolve_applicable(db: &DatabaseConnection, usage: &campaign_usage::Model) -> Result<MorphRecord> {
    morph::resolve_existing(db, MorphRef::new(usage.applicable_type, usage.applicable_id)).await
}

/// Every usage of a campaign, reversed ones included, oldest first.
pub async fn usages_for_campaign(db: &DatabaseConnection, campaign_id: i64) -> Result<Vec<campaign_usage::Model>> {
    CampaignUsage::find()
        .filter(campaign_usage::Column::CampaignId.eq(campaign_id))
        .order_by_asc(campaign_usage::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
