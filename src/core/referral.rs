//! Referral campaigns, referrals and contest entries.
//!
//! A referrer earns the campaign's bonus once their referee qualifies and is
//! rewarded; every reward also grants the referrer one bonus contest entry for
//! that campaign.

use crate::{
    core::{counters, guards, slug},
    entities::{
        ContestEntry, Referral, ReferralCampaign, User, contest_entry,
        referral::{self, ReferralStatus},
        referral_campaign, user,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument, warn};

const CAMPAIGN: &str = "referral_campaign";
const ENTITY: &str = "referral";
const CONTEST_ENTRY: &str = "contest_entry";

/// Input for [`create_referral_campaign`] and [`update_referral_campaign`]
#[derive(Debug, Clone)]
pub struct NewReferralCampaign {
    /// Display name; the slug is derived from it
    pub name: String,
    /// Paid to the referrer
    pub bonus_amount: Decimal,
    /// Paid to the referee
    pub referee_bonus_amount: Decimal,
    /// First day referrals count
    pub start_date: NaiveDate,
    /// Last day referrals count
    pub end_date: NaiveDate,
    /// Referrals each referrer may record in this campaign
    pub max_referrals_per_user: Option<i32>,
}

/// Pre-save checks for a referral campaign.
pub fn validate_referral_campaign(input: &NewReferralCampaign) -> Result<()> {
    guards::ensure_not_blank("name", &input.name)?;
    guards::ensure_date_order("end_date", input.start_date, input.end_date)?;
    guards::ensure_not_negative("bonus_amount", input.bonus_amount)?;
    guards::ensure_not_negative("referee_bonus_amount", input.referee_bonus_amount)?;
    if input.max_referrals_per_user.is_some_and(|max| max <= 0) {
        return Err(Error::validation("max_referrals_per_user", "must be greater than zero"));
    }
    Ok(())
}

/// Creates an active campaign with a unique slug.
pub async fn create_referral_campaign(
    db: &DatabaseConnection,
    input: NewReferralCampaign,
) -> Result<referral_campaign::Model> {
    validate_referral_campaign(&input)?;
    let slug = slug::unique_slug::<ReferralCampaign, _>(
        db,
        referral_campaign::Column::Slug,
        &slug::slugify(&input.name),
    )
    .await?;

    let now = Utc::now();
    let campaign = referral_campaign::ActiveModel {
        name: Set(input.name.trim().to_string()),
        slug: Set(slug),
        bonus_amount: Set(input.bonus_amount),
        referee_bonus_amount: Set(input.referee_bonus_amount),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        max_referrals_per_user: Set(input.max_referrals_per_user),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(campaign_id = campaign.id, slug = %campaign.slug, "Referral campaign created");
    Ok(campaign)
}

async fn find_campaign<C>(db: &C, id: i64) -> Result<referral_campaign::Model>
where
    C: ConnectionTrait,
{
    ReferralCampaign::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(CAMPAIGN, id))
}

/// Replaces the campaign's terms. The slug is kept.
pub async fn update_referral_campaign(
    db: &DatabaseConnection,
    id: i64,
    input: NewReferralCampaign,
) -> Result<referral_campaign::Model> {
    validate_referral_campaign(&input)?;
    let campaign = find_campaign(db, id).await?;

    let mut active: referral_campaign::ActiveModel = campaign.into();
    active.name = Set(input.name.trim().to_string());
    active.bonus_amount = Set(input.bonus_amount);
    active.referee_bonus_amount = Set(input.referee_bonus_amount);
    active.start_date = Set(input.start_date);
    active.end_date = Set(input.end_date);
    active.max_referrals_per_user = Set(input.max_referrals_per_user);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Records that `referrer_id` brought in `referee_id`.
///
/// A user cannot refer themselves and can only ever be referred once. When a
/// campaign is given it must be running today and the referrer must be under
/// its per-user limit.
#[instrument(skip(db))]
pub async fn record_referral(
    db: &DatabaseConnection,
    referrer_id: i64,
    referee_id: i64,
    campaign_id: Option<i64>,
) -> Result<referral::Model> {
    if referrer_id == referee_id {
        warn!(referrer_id, "Rejected self-referral");
        return Err(Error::validation("referee_id", "users cannot refer themselves"));
    }

    let txn = db.begin().await?;
    User::find_by_id(referrer_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("user", referrer_id))?;
    let referee = User::find_by_id(referee_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("user", referee_id))?;

    let existing = Referral::find()
        .filter(referral::Column::RefereeId.eq(referee_id))
        .count(&txn)
        .await?;
    if existing > 0 || referee.referred_by.is_some() {
        return Err(Error::validation("referee_id", "user has already been referred"));
    }

    if let Some(campaign_id) = campaign_id {
        let campaign = find_campaign(&txn, campaign_id).await?;
        if !campaign.is_running_on(Utc::now().date_naive()) {
            return Err(Error::validation("referral_campaign_id", "campaign is not running"));
        }
        if let Some(max) = campaign.max_referrals_per_user {
            let made = Referral::find()
                .filter(referral::Column::ReferrerId.eq(referrer_id))
                .filter(referral::Column::ReferralCampaignId.eq(campaign_id))
                .count(&txn)
                .await?;
            if made >= u64::try_from(max).unwrap_or(0) {
                return Err(Error::validation(
                    "referrer_id",
                    format!("referral limit of {max} reached for this campaign"),
                ));
            }
        }
    }

    let now = Utc::now();
    let referral = referral::ActiveModel {
        referrer_id: Set(referrer_id),
        referee_id: Set(referee_id),
        referral_campaign_id: Set(campaign_id),
        status: Set(ReferralStatus::Pending),
        reward_amount: Set(Decimal::ZERO),
        rewarded_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut referee: user::ActiveModel = referee.into();
    referee.referred_by = Set(Some(referrer_id));
    referee.updated_at = Set(now);
    referee.update(&txn).await?;

    txn.commit().await?;
    info!(referral_id = referral.id, "Referral recorded");
    Ok(referral)
}

async fn find_referral<C>(db: &C, id: i64) -> Result<referral::Model>
where
    C: ConnectionTrait,
{
    Referral::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))
}

/// Pending to qualified, e.g. once the referee completes KYC.
pub async fn qualify_referral(db: &DatabaseConnection, id: i64) -> Result<referral::Model> {
    let referral = find_referral(db, id).await?;
    if referral.status != ReferralStatus::Pending {
        return Err(Error::validation(
            "status",
            format!("only pending referrals qualify (is {:?})", referral.status),
        ));
    }
    let mut active: referral::ActiveModel = referral.into();
    active.status = Set(ReferralStatus::Qualified);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Pays out a qualified referral.
///
/// The reward is the campaign's `bonus_amount` at the time of rewarding (zero
/// without a campaign), and the referrer gains one bonus contest entry.
pub async fn reward_referral(db: &DatabaseConnection, id: i64) -> Result<referral::Model> {
    let txn = db.begin().await?;
    let referral = find_referral(&txn, id).await?;
    if referral.status != ReferralStatus::Qualified {
        return Err(Error::validation(
            "status",
            format!("only qualified referrals are rewarded (is {:?})", referral.status),
        ));
    }

    let campaign = match referral.referral_campaign_id {
        Some(campaign_id) => Some(find_campaign(&txn, campaign_id).await?),
        None => None,
    };
    let reward = campaign.as_ref().map_or(Decimal::ZERO, |c| c.bonus_amount);

    let mut active: referral::ActiveModel = referral.into();
    active.status = Set(ReferralStatus::Rewarded);
    active.reward_amount = Set(reward);
    active.rewarded_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let referral = active.update(&txn).await?;

    if let Some(campaign) = campaign {
        let entry = find_or_create_entry(&txn, referral.referrer_id, campaign.id, 0).await?;
        counters::adjust_counter::<ContestEntry, _>(
            &txn,
            CONTEST_ENTRY,
            contest_entry::Column::Id,
            entry.id,
            contest_entry::Column::BonusEntries,
            1,
        )
        .await?;
    }

    txn.commit().await?;
    info!(referral_id = id, %reward, "Referral rewarded");
    Ok(referral)
}

/// Referrals made by a user, oldest first.
pub async fn referrals_by_referrer(db: &DatabaseConnection, referrer_id: i64) -> Result<Vec<referral::Model>> {
    Referral::find()
        .filter(referral::Column::ReferrerId.eq(referrer_id))
        .order_by_asc(referral::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn find_or_create_entry<C>(
    db: &C,
    user_id: i64,
    campaign_id: i64,
    base_entries: i32,
) -> Result<contest_entry::Model>
where
    C: ConnectionTrait,
{
    let existing = ContestEntry::find()
        .filter(contest_entry::Column::UserId.eq(user_id))
        .filter(contest_entry::Column::ReferralCampaignId.eq(campaign_id))
        .one(db)
        .await?;
    if let Some(entry) = existing {
        return Ok(entry);
    }

    let now = Utc::now();
    contest_entry::ActiveModel {
        user_id: Set(user_id),
        referral_campaign_id: Set(campaign_id),
        base_entries: Set(base_entries),
        bonus_entries: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Enters a user into a campaign's contest with one base entry. Entering again
/// returns the existing row.
///
/// A row created earlier by a reward or bonus grant holds no base entry yet;
/// entering raises it to one.
pub async fn enter_contest(db: &DatabaseConnection, user_id: i64, campaign_id: i64) -> Result<contest_entry::Model> {
    let txn = db.begin().await?;
    find_campaign(&txn, campaign_id).await?;
    let entry = find_or_create_entry(&txn, user_id, campaign_id, 1).await?;
    if entry.base_entries > 0 {
        txn.commit().await?;
        return Ok(entry);
    }

    ContestEntry::update_many()
        .col_expr(contest_entry::Column::BaseEntries, Expr::value(1))
        .col_expr(contest_entry::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(contest_entry::Column::Id.eq(entry.id))
        .filter(contest_entry::Column::BaseEntries.eq(0))
        .exec(&txn)
        .await?;
    let entry = ContestEntry::find_by_id(entry.id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(CONTEST_ENTRY, entry.id))?;
    txn.commit().await?;
    Ok(entry)
}

/// Grants extra entries atomically.
pub async fn add_bonus_entries(
    db: &DatabaseConnection,
    user_id: i64,
    campaign_id: i64,
    entries: i32,
) -> Result<contest_entry::Model> {
    if entries <= 0 {
        return Err(Error::validation("bonus_entries", "must be greater than zero"));
    }
    let txn = db.begin().await?;
    find_campaign(&txn, campaign_id).await?;
    let entry = find_or_create_entry(&txn, user_id, campaign_id, 0).await?;
    counters::adjust_counter::<ContestEntry, _>(
        &txn,
        CONTEST_ENTRY,
        contest_entry::Column::Id,
        entry.id,
        contest_entry::Column::BonusEntries,
        i64::from(entries),
    )
    .await?;
    let entry = ContestEntry::find_by_id(entry.id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(CONTEST_ENTRY, entry.id))?;
    txn.commit().await?;
    Ok(entry)
}

/// The user's contest entry for a campaign, if any.
pub async fn contest_entry_for(
    db: &DatabaseConnection,
    user_id: i64,
    campaign_id: i64,
) -> Result<Option<contest_entry::Model>> {
    ContestEntry::find()
        .filter(contest_entry::Column::UserId.eq(user_id))
        .filter(contest_entry::Column::ReferralCampaignId.eq(campaign_id))
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn running_campaign(name: &str) -> NewReferralCampaign {
        let today = Utc::now().date_naive();
        NewReferralCampaign {
            name: name.to_string(),
            bonus_amount: Decimal::new(50_000, 2),
            referee_bonus_amount: Decimal::new(25_000, 2),
            start_date: today - chrono::Duration::days(7),
            end_date: today + chrono::Duration::days(7),
            max_referrals_per_user: None,
        }
    }

    #[test]
    fn test_campaign_validation() {
        assert!(validate_referral_campaign(&running_campaign("Diwali")).is_ok());

        let mut backwards = running_campaign("Diwali");
        backwards.end_date = backwards.start_date - chrono::Duration::days(1);
        assert!(matches!(
            validate_referral_campaign(&backwards),
            Err(Error::Validation { field: "end_date", .. })
        ));

        let mut one_day = running_campaign("Diwali");
        one_day.end_date = one_day.start_date;
        assert!(validate_referral_campaign(&one_day).is_ok());

        let mut negative = running_campaign("Diwali");
        negative.bonus_amount = Decimal::new(-1, 0);
        assert!(matches!(
            validate_referral_campaign(&negative),
            Err(Error::Validation { field: "bonus_amount", .. })
        ));

        let mut negative_referee = running_campaign("Diwali");
        negative_referee.referee_bonus_amount = Decimal::new(-5, 1);
        assert!(matches!(
            validate_referral_campaign(&negative_referee),
            Err(Error::Validation { field: "referee_bonus_amount", .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_campaign_is_not_stored() -> Result<()> {
        let db = setup_test_db().await?;
        let mut backwards = running_campaign("Broken");
        backwards.end_date = backwards.start_date - chrono::Duration::days(3);
        assert!(create_referral_campaign(&db, backwards).await.is_err());
        assert_eq!(ReferralCampaign::find().count(&db).await?, 0);

        let campaign = create_referral_campaign(&db, running_campaign("Monsoon")).await?;
        let mut update = running_campaign("Monsoon");
        update.bonus_amount = Decimal::new(-100, 2);
        assert!(update_referral_campaign(&db, campaign.id, update).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_referral_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice@example.com").await?;
        let bob = create_test_user(&db, "bob@example.com").await?;
        let carol = create_test_user(&db, "carol@example.com").await?;

        let own = record_referral(&db, alice.id, alice.id, None).await;
        assert!(matches!(own, Err(Error::Validation { field: "referee_id", .. })));

        let referral = record_referral(&db, alice.id, bob.id, None).await?;
        assert_eq!(referral.status, ReferralStatus::Pending);
        let bob = User::find_by_id(bob.id).one(&db).await?.unwrap();
        assert_eq!(bob.referred_by, Some(alice.id));

        let again = record_referral(&db, carol.id, bob.id, None).await;
        assert!(matches!(again, Err(Error::Validation { field: "referee_id", .. })));

        let mut limited = running_campaign("Limited");
        limited.max_referrals_per_user = Some(1);
        let limited = create_referral_campaign(&db, limited).await?;
        let dave = create_test_user(&db, "dave@example.com").await?;
        record_referral(&db, carol.id, dave.id, Some(limited.id)).await?;
        let erin = create_test_user(&db, "erin@example.com").await?;
        let over = record_referral(&db, carol.id, erin.id, Some(limited.id)).await;
        assert!(matches!(over, Err(Error::Validation { field: "referrer_id", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_reward_grants_bonus_and_entry() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice@example.com").await?;
        let bob = create_test_user(&db, "bob@example.com").await?;
        let campaign = create_referral_campaign(&db, running_campaign("Festive")).await?;

        let entry = enter_contest(&db, alice.id, campaign.id).await?;
        assert_eq!(entry.total_entries(), 1);

        let referral = record_referral(&db, alice.id, bob.id, Some(campaign.id)).await?;
        assert!(matches!(
            reward_referral(&db, referral.id).await,
            Err(Error::Validation { field: "status", .. })
        ));

        qualify_referral(&db, referral.id).await?;
        let rewarded = reward_referral(&db, referral.id).await?;
        assert_eq!(rewarded.status, ReferralStatus::Rewarded);
        assert_eq!(rewarded.reward_amount, Decimal::new(500, 0));
        assert!(rewarded.rewarded_at.is_some());

        let entry = contest_entry_for(&db, alice.id, campaign.id).await?.unwrap();
        assert_eq!(entry.base_entries, 1);
        assert_eq!(entry.bonus_entries, 1);

        let entry = add_bonus_entries(&db, alice.id, campaign.id, 3).await?;
        assert_eq!(entry.total_entries(), 5);

        assert_eq!(referrals_by_referrer(&db, alice.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_entering_after_reward_adds_base_entry() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice@example.com").await?;
        let bob = create_test_user(&db, "bob@example.com").await?;
        let campaign = create_referral_campaign(&db, running_campaign("Holi")).await?;

        let referral = record_referral(&db, alice.id, bob.id, Some(campaign.id)).await?;
        qualify_referral(&db, referral.id).await?;
        reward_referral(&db, referral.id).await?;
        let before = contest_entry_for(&db, alice.id, campaign.id).await?.unwrap();
        assert_eq!((before.base_entries, before.bonus_entries), (0, 1));

        let entry = enter_contest(&db, alice.id, campaign.id).await?;
        assert_eq!(entry.id, before.id);
        assert_eq!(entry.base_entries, 1);
        assert_eq!(entry.bonus_entries, 1);
        assert_eq!(entry.total_entries(), 2);

        // Entering again is a no-op
        let again = enter_contest(&db, alice.id, campaign.id).await?;
        assert_eq!(again.total_entries(), 2);
        Ok(())
    }
}
