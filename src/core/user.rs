//! Platform users.

use crate::{
    core::guards,
    entities::{
        User,
        user::{self, UserRole},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

const ENTITY: &str = "user";

/// Input for [`create_user`]
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Login email, stored lower-cased
    pub email: String,
    /// Contact number
    pub phone: Option<String>,
    /// What the account may do
    pub role: UserRole,
}

impl NewUser {
    /// An investor with no phone number.
    #[must_use]
    pub fn investor(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            role: UserRole::Investor,
        }
    }
}

/// Referral code handed out to every user, derived from the id.
#[must_use]
pub fn referral_code_for(id: i64) -> String {
    format!("INV{id:06}")
}

/// Basic shape check: one `@`, a non-empty local part, a dotted domain.
fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(Error::validation("email", format!("`{email}` is not a valid address")));
    }
    Ok(())
}

/// Creates a user with a normalised email and an `INV000123`-style referral code.
pub async fn create_user(db: &DatabaseConnection, input: NewUser) -> Result<user::Model> {
    guards::ensure_not_blank("name", &input.name)?;
    let email = input.email.trim().to_lowercase();
    validate_email(&email)?;

    let txn = db.begin().await?;
    if find_by_email(&txn, &email).await?.is_some() {
        return Err(Error::validation("email", format!("`{email}` is already registered")));
    }

    let now = Utc::now();
    let user = user::ActiveModel {
        name: Set(input.name.trim().to_string()),
        // Placeholder until the id is known; emails are unique so this is too
        referral_code: Set(format!("pending:{email}")),
        email: Set(email),
        phone: Set(input.phone),
        role: Set(input.role),
        referred_by: Set(None),
        is_active: Set(true),
        is_deleted: Set(false),
        email_verified_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let code = referral_code_for(user.id);
    let mut active: user::ActiveModel = user.into();
    active.referral_code = Set(code);
    let user = active.update(&txn).await?;

    txn.commit().await?;
    info!(user_id = user.id, role = ?user.role, "User created");
    Ok(user)
}

/// Loads a user by id.
pub async fn find_user<C>(db: &C, id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))
}

/// Looks up a user by email, ignoring case.
pub async fn find_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks up the owner of a referral code.
pub async fn find_by_referral_code(db: &DatabaseConnection, code: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::ReferralCode.eq(code.trim().to_uppercase()))
        .filter(user::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Stamps `email_verified_at`. Verifying again keeps the first time.
pub async fn verify_email(db: &DatabaseConnection, id: i64) -> Result<user::Model> {
    let user = find_user(db, id).await?;
    if user.is_verified() {
        return Ok(user);
    }
    let mut active: user::ActiveModel = user.into();
    active.email_verified_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Blocks the account without hiding it.
pub async fn deactivate_user(db: &DatabaseConnection, id: i64) -> Result<user::Model> {
    let user = find_user(db, id).await?;
    let mut active: user::ActiveModel = user.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now());
    let user = active.update(db).await?;
    info!(user_id = id, "User deactivated");
    Ok(user)
}

/// Hides the user but keeps the row; investments and audit entries still point at it.
pub async fn soft_delete_user(db: &DatabaseConnection, id: i64) -> Result<user::Model> {
    let user = find_user(db, id).await?;
    let mut active: user::ActiveModel = user.into();
    active.is_active = Set(false);
    active.is_deleted = Set(true);
    active.updated_at = Set(Utc::now());
    let user = active.update(db).await?;
    info!(user_id = id, "User soft-deleted");
    Ok(user)
}

/// Active, non-deleted users ordered by id.
pub async fn active_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::IsActive.eq(true))
        .filter(user::Column::IsDeleted.eq(false))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Users holding a role, ordered by id.
pub async fn users_by_role(db: &DatabaseConnection, role: UserRole) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::Role.eq(role))
        .filter(user::Column::IsDeleted.eq(false))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
