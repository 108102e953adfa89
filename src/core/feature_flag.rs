//! Feature flags with deterministic percentage rollout.
//!
//! A user's bucket for a flag is `crc32(user_id ++ flag_key) % 100`. Both the
//! checksum and the concatenation order are fixed: changing either reshuffles
//! every user that is already inside a partial rollout.

use crate::{
    core::guards,
    entities::{FeatureFlag, feature_flag},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

const ENTITY: &str = "feature_flag";

/// Bucket 0..=99 for a user identifier and flag key.
#[must_use]
pub fn rollout_bucket(user_identifier: &str, flag_key: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(user_identifier.as_bytes());
    hasher.update(flag_key.as_bytes());
    hasher.finalize() % 100
}

/// The rollout rule.
///
/// 1. Inactive flags are off for everyone.
/// 2. Without a percentage, or at 100 and above, the flag is on for everyone.
/// 3. Anonymous callers never get a partial rollout.
/// 4. Otherwise the user is in when their bucket is below `percentage`.
#[must_use]
pub fn is_enabled(flag_key: &str, active: bool, percentage: Option<i32>, user_id: Option<i64>) -> bool {
    if !active {
        return false;
    }
    let percentage = match percentage {
        None => return true,
        Some(p) if p >= 100 => return true,
        Some(p) => p,
    };
    let Some(user_id) = user_id else {
        return false;
    };
    let bucket = rollout_bucket(&user_id.to_string(), flag_key);
    i64::from(bucket) < i64::from(percentage)
}

/// Applies [`is_enabled`] to a stored flag.
#[must_use]
pub fn flag_enabled_for(flag: &feature_flag::Model, user_id: Option<i64>) -> bool {
    is_enabled(&flag.key, flag.active, flag.percentage, user_id)
}

fn validate_percentage(percentage: Option<i32>) -> Result<()> {
    match percentage {
        Some(p) if !(0..=100).contains(&p) => Err(Error::validation(
            "percentage",
            format!("must be between 0 and 100 (got {p})"),
        )),
        _ => Ok(()),
    }
}

/// Creates a flag. The key must be unique.
pub async fn create_flag(
    db: &DatabaseConnection,
    key: &str,
    name: &str,
    active: bool,
    percentage: Option<i32>,
) -> Result<feature_flag::Model> {
    guards::ensure_not_blank("key", key)?;
    guards::ensure_not_blank("name", name)?;
    validate_percentage(percentage)?;

    if find_flag(db, key).await?.is_some() {
        return Err(Error::validation("key", format!("flag `{key}` already exists")));
    }

    let now = Utc::now();
    let flag = feature_flag::ActiveModel {
        key: Set(key.trim().to_string()),
        name: Set(name.trim().to_string()),
        description: Set(None),
        active: Set(active),
        percentage: Set(percentage),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(key = %flag.key, active, ?percentage, "Feature flag created");
    Ok(flag)
}

/// Looks up a flag by key.
pub async fn find_flag(db: &DatabaseConnection, key: &str) -> Result<Option<feature_flag::Model>> {
    FeatureFlag::find()
        .filter(feature_flag::Column::Key.eq(key.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn find_flag_by_id(db: &DatabaseConnection, id: i64) -> Result<feature_flag::Model> {
    FeatureFlag::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))
}

/// Changes the rollout share. `None` means everyone.
pub async fn update_flag_rollout(
    db: &DatabaseConnection,
    id: i64,
    percentage: Option<i32>,
) -> Result<feature_flag::Model> {
    validate_percentage(percentage)?;
    let flag = find_flag_by_id(db, id).await?;
    let mut active: feature_flag::ActiveModel = flag.into();
    active.percentage = Set(percentage);
    active.updated_at = Set(Utc::now());
    let flag = active.update(db).await?;
    info!(key = %flag.key, ?percentage, "Feature flag rollout changed");
    Ok(flag)
}

/// Switches a flag on or off without touching its rollout share.
pub async fn set_flag_active(db: &DatabaseConnection, id: i64, on: bool) -> Result<feature_flag::Model> {
    let flag = find_flag_by_id(db, id).await?;
    let mut active: feature_flag::ActiveModel = flag.into();
    active.active = Set(on);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Looks up a flag by key and evaluates it. Unknown flags are off.
#[instrument(skip(db))]
pub async fn is_flag_enabled(db: &DatabaseConnection, key: &str, user_id: Option<i64>) -> Result<bool> {
    let Some(flag) = find_flag(db, key).await? else {
        debug!("Unknown feature flag treated as disabled");
        return Ok(false);
    };
    Ok(flag_enabled_for(&flag, user_id))
}

/// All flags ordered by key.
pub async fn all_flags(db: &DatabaseConnection) -> Result<Vec<feature_flag::Model>> {
    FeatureFlag::find()
        .order_by_asc(feature_flag::Column::Key)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_bucket_matches_crc32_of_concatenation() {
        assert_eq!(rollout_bucket("42", "beta"), crc32fast::hash(b"42beta") % 100);
        assert_eq!(rollout_bucket("beta", "42"), crc32fast::hash(b"beta42") % 100);
        // Well-known CRC-32 check value
        assert_eq!(crc32fast::hash(b"123456789"), 0xCBF4_3926);
        assert_eq!(rollout_bucket("12345", "6789"), 0xCBF4_3926 % 100);
    }

    #[test]
    fn test_inactive_flag_is_off_for_everyone() {
        for percentage in [None, Some(0), Some(50), Some(100), Some(150)] {
            assert!(!is_enabled("beta", false, percentage, None));
            assert!(!is_enabled("beta", false, percentage, Some(1)));
            assert!(!is_enabled("beta", false, percentage, Some(987_654)));
        }
    }

    #[test]
    fn test_full_rollout_is_on_for_everyone() {
        for percentage in [None, Some(100), Some(250)] {
            assert!(is_enabled("beta", true, percentage, None));
            assert!(is_enabled("beta", true, percentage, Some(1)));
        }
    }

    #[test]
    fn test_anonymous_users_never_get_partial_rollouts() {
        assert!(!is_enabled("beta", true, Some(99), None));
        assert!(!is_enabled("beta", true, Some(1), None));
    }

    #[test]
    fn test_zero_percent_is_off() {
        for user_id in 1..200 {
            assert!(!is_enabled("beta", true, Some(0), Some(user_id)));
        }
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        for user_id in 1..500 {
            let first = is_enabled("new_checkout", true, Some(30), Some(user_id));
            let second = is_enabled("new_checkout", true, Some(30), Some(user_id));
            assert_eq!(first, second);
            let bucket = rollout_bucket(&user_id.to_string(), "new_checkout");
            assert_eq!(first, bucket < 30);
        }
    }

    #[test]
    fn test_half_rollout_distribution() {
        let enabled = (1..=10_000_i64)
            .filter(|user_id| is_enabled("beta", true, Some(50), Some(*user_id)))
            .count();
        assert!(
            (4_500..=5_500).contains(&enabled),
            "expected roughly half of users enabled, got {enabled}"
        );
    }

    #[test]
    fn test_raising_percentage_keeps_existing_users_in() {
        for user_id in 1..1_000 {
            if is_enabled("beta", true, Some(20), Some(user_id)) {
                assert!(is_enabled("beta", true, Some(60), Some(user_id)));
            }
        }
    }

    #[tokio::test]
    async fn test_stored_flags() -> Result<()> {
        let db = setup_test_db().await?;
        let flag = create_flag(&db, "beta", "Beta dashboard", true, Some(50)).await?;

        let duplicate = create_flag(&db, "beta", "Again", true, None).await;
        assert!(matches!(duplicate, Err(Error::Validation { field: "key", .. })));

        let invalid = create_flag(&db, "gamma", "Gamma", true, Some(101)).await;
        assert!(matches!(invalid, Err(Error::Validation { field: "percentage", .. })));

        assert!(!is_flag_enabled(&db, "missing", Some(1)).await?);
        assert!(!is_flag_enabled(&db, "beta", None).await?);

        let flag = update_flag_rollout(&db, flag.id, None).await?;
        assert_eq!(flag.percentage, None);
        assert!(is_flag_enabled(&db, "beta", None).await?);

        set_flag_active(&db, flag.id, false).await?;
        assert!(!is_flag_enabled(&db, "beta", Some(1)).await?);

        assert_eq!(all_flags(&db).await?.len(), 1);
        Ok(())
    }
}
