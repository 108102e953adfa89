//! Deals (fundraising rounds) and their listing activity feed.

use crate::{
    core::{guards, slug},
    entities::{
        Company, Deal, ListingActivity, User,
        deal::{self, DealStatus},
        listing_activity::{self, ActorType},
        user,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::json;
use tracing::info;

const ENTITY: &str = "deal";

/// Who performed a listing action. Stored as `actor_type` plus `actor_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingActor {
    /// A platform user acting on their own listing
    User(i64),
    /// Platform staff
    Admin(i64),
    /// Scheduled jobs and automated checks
    System,
}

impl ListingActor {
    /// Column values for this actor.
    #[must_use]
    pub const fn parts(self) -> (ActorType, Option<i64>) {
        match self {
            Self::User(id) => (ActorType::User, Some(id)),
            Self::Admin(id) => (ActorType::Admin, Some(id)),
            Self::System => (ActorType::System, None),
        }
    }

    /// Rebuilds the actor from stored columns. A user or admin row without an id
    /// is inconsistent and yields a validation error.
    pub fn from_parts(actor_type: ActorType, actor_id: Option<i64>) -> Result<Self> {
        match (actor_type, actor_id) {
            (ActorType::User, Some(id)) => Ok(Self::User(id)),
            (ActorType::Admin, Some(id)) => Ok(Self::Admin(id)),
            (ActorType::System, _) => Ok(Self::System),
            (kind, None) => Err(Error::validation(
                "actor_id",
                format!("{kind:?} actor requires an id"),
            )),
        }
    }
}

/// Input for [`create_deal`]
#[derive(Debug, Clone)]
pub struct NewDeal {
    /// Company raising the round
    pub company_id: i64,
    /// Sector the deal is listed under
    pub sector_id: Option<i64>,
    /// Listing title; the slug is derived from it
    pub title: String,
    /// Smallest ticket accepted, in paise
    pub min_investment_paise: i64,
    /// Fundraising goal, in paise
    pub target_amount_paise: i64,
    /// First day investments are accepted
    pub opens_on: NaiveDate,
    /// Last day investments are accepted
    pub closes_on: NaiveDate,
}

/// Creates a draft deal.
pub async fn create_deal(db: &DatabaseConnection, input: NewDeal) -> Result<deal::Model> {
    guards::ensure_not_blank("title", &input.title)?;
    guards::ensure_positive_paise("min_investment_paise", input.min_investment_paise)?;
    guards::ensure_positive_paise("target_amount_paise", input.target_amount_paise)?;
    if input.min_investment_paise > input.target_amount_paise {
        return Err(Error::validation(
            "min_investment_paise",
            "must not exceed the target amount",
        ));
    }
    guards::ensure_date_order("closes_on", input.opens_on, input.closes_on)?;

    Company::find_by_id(input.company_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("company", input.company_id))?;
    let slug = slug::unique_slug::<Deal, _>(db, deal::Column::Slug, &slug::slugify(&input.title)).await?;

    let now = Utc::now();
    let deal = deal::ActiveModel {
        company_id: Set(input.company_id),
        sector_id: Set(input.sector_id),
        title: Set(input.title.trim().to_string()),
        slug: Set(slug),
        min_investment_paise: Set(input.min_investment_paise),
        target_amount_paise: Set(input.target_amount_paise),
        raised_amount_paise: Set(0),
        status: Set(DealStatus::Draft),
        opens_on: Set(input.opens_on),
        closes_on: Set(input.closes_on),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(deal_id = deal.id, slug = %deal.slug, "Deal created");
    Ok(deal)
}

/// Loads a deal by id.
pub async fn find_deal<C>(db: &C, id: i64) -> Result<deal::Model>
where
    C: ConnectionTrait,
{
    Deal::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))
}

async fn change_status(
    db: &DatabaseConnection,
    id: i64,
    from: DealStatus,
    to: DealStatus,
    actor: ListingActor,
    action: &str,
) -> Result<deal::Model> {
    let txn = db.begin().await?;
    let deal = find_deal(&txn, id).await?;
    if deal.status != from {
        return Err(Error::validation(
            "status",
            format!("deal must be {from:?} to move to {to:?} (is {:?})", deal.status),
        ));
    }

    let mut active: deal::ActiveModel = deal.into();
    active.status = Set(to);
    active.updated_at = Set(Utc::now());
    let deal = active.update(&txn).await?;

    record_listing_activity(&txn, id, actor, action, json!({ "status": to })).await?;
    txn.commit().await?;
    info!(deal_id = id, status = ?to, "Deal status changed");
    Ok(deal)
}

/// Draft to live.
pub async fn publish_deal(db: &DatabaseConnection, id: i64, actor: ListingActor) -> Result<deal::Model> {
    change_status(db, id, DealStatus::Draft, DealStatus::Live, actor, "deal.published").await
}

/// Live to closed.
pub async fn close_deal(db: &DatabaseConnection, id: i64, actor: ListingActor) -> Result<deal::Model> {
    change_status(db, id, DealStatus::Live, DealStatus::Closed, actor, "deal.closed").await
}

/// Live deals whose window contains `date`, closing soonest first.
pub async fn live_deals_on(db: &DatabaseConnection, date: NaiveDate) -> Result<Vec<deal::Model>> {
    Deal::find()
        .filter(deal::Column::Status.eq(DealStatus::Live))
        .filter(deal::Column::IsDeleted.eq(false))
        .filter(deal::Column::OpensOn.lte(date))
        .filter(deal::Column::ClosesOn.gte(date))
        .order_by_asc(deal::Column::ClosesOn)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Appends one entry to a deal's listing history. Run it on the transaction of the change it describes.
pub async fn record_listing_activity<C>(
    db: &C,
    deal_id: i64,
    actor: ListingActor,
    action: &str,
    details: Json,
) -> Result<listing_activity::Model>
where
    C: ConnectionTrait,
{
    guards::ensure_not_blank("action", action)?;
    let (actor_type, actor_id) = actor.parts();
    listing_activity::ActiveModel {
        deal_id: Set(deal_id),
        actor_type: Set(actor_type),
        actor_id: Set(actor_id),
        action: Set(action.to_string()),
        details: Set(details),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Activity on a deal in the order it happened.
pub async fn listing_activities(db: &DatabaseConnection, deal_id: i64) -> Result<Vec<listing_activity::Model>> {
    ListingActivity::find()
        .filter(listing_activity::Column::DealId.eq(deal_id))
        .order_by_asc(listing_activity::Column::CreatedAt)
        .order_by_asc(listing_activity::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads the user behind a listing activity. System actions have none.
pub async fn resolve_listing_actor(
    db: &DatabaseConnection,
    activity: &listing_activity::Model,
) -> Result<Option<user::Model>> {
    match ListingActor::from_parts(activity.actor_type, activity.actor_id)? {
        ListingActor::System => Ok(None),
        ListingActor::User(id) | ListingActor::Admin(id) => {
            let user = User::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("user", id))?;
            Ok(Some(user))
        }
    }
}
