//! Shared test utilities.
//!
//! Helpers for opening an in-memory database and creating rows with sensible
//! defaults, so tests only spell out the fields they care about.

use crate::{
    core::{
        company::{self, NewCompany},
        deal::{self, ListingActor, NewDeal},
        feedback, sector,
        user::{self, NewUser},
    },
    entities::{self, user::UserRole},
    errors::Result,
};
use chrono::{Duration, Utc};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an active investor. The name is the local part of `email`.
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<entities::user::Model> {
    let name = email.split('@').next().unwrap_or(email);
    user::create_user(db, NewUser::investor(name, email)).await
}

/// Creates an active admin.
pub async fn create_test_admin(db: &DatabaseConnection, email: &str) -> Result<entities::user::Model> {
    let name = email.split('@').next().unwrap_or(email);
    user::create_user(
        db,
        NewUser {
            role: UserRole::Admin,
            ..NewUser::investor(name, email)
        },
    )
    .await
}

/// Creates an active sector with no description.
pub async fn create_test_sector(db: &DatabaseConnection, name: &str) -> Result<entities::sector::Model> {
    sector::create_sector(db, name, None).await
}

/// Creates a company without a sector and with a derived slug.
pub async fn create_test_company(
    db: &DatabaseConnection,
    owner_id: i64,
    name: &str,
) -> Result<entities::company::Model> {
    company::create_company(
        db,
        NewCompany {
            owner_id,
            name: name.to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Creates a live deal that opened yesterday and closes in 30 days.
///
/// # Defaults
/// * `min_investment_paise`: 500,000 (5,000 rupees)
/// * `target_amount_paise`: 10,000,000 (1 lakh rupees)
pub async fn create_test_deal(
    db: &DatabaseConnection,
    company_id: i64,
    title: &str,
) -> Result<entities::deal::Model> {
    let today = Utc::now().date_naive();
    let draft = deal::create_deal(
        db,
        NewDeal {
            company_id,
            sector_id: None,
            title: title.to_string(),
            min_investment_paise: 500_000,
            target_amount_paise: 10_000_000,
            opens_on: today - Duration::days(1),
            closes_on: today + Duration::days(30),
        },
    )
    .await?;
    deal::publish_deal(db, draft.id, ListingActor::System).await
}

/// Creates an unpublished help article with zeroed counters.
pub async fn create_test_article(db: &DatabaseConnection, title: &str) -> Result<entities::help_article::Model> {
    feedback::create_article(db, title, "Article body", None).await
}
