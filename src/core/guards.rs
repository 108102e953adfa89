//! Write-path guards and input validators.
//!
//! These replace before-save/before-delete hooks: each write function calls the
//! guards it needs and gets a typed [`Error`] back instead of an interception.

use crate::errors::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait, IdenStatic, Iterable};
use tracing::warn;

/// Names of the columns an active model would write on `update`.
///
/// Columns loaded from the database are `Unchanged`; only fields assigned with
/// `Set` count as changes.
pub fn changed_columns<A>(active: &A) -> Vec<String>
where
    A: ActiveModelTrait,
{
    <<A as ActiveModelTrait>::Entity as EntityTrait>::Column::iter()
        .filter(|column| matches!(active.get(*column), ActiveValue::Set(_)))
        .map(|column| column.as_str().to_string())
        .collect()
}

/// Rejects the write if any changed column is outside `allowed`.
pub fn ensure_only_columns(
    entity: &'static str,
    id: i64,
    changed: &[String],
    allowed: &[&str],
) -> Result<()> {
    if let Some(column) = changed.iter().find(|column| !allowed.contains(&column.as_str())) {
        warn!(entity, id, column = %column, "Rejected write to immutable column");
        return Err(Error::ImmutableRecord {
            entity,
            id,
            operation: format!("modify column `{column}`"),
        });
    }
    Ok(())
}

/// The error returned for every delete of a write-once record.
#[must_use]
pub fn delete_rejected(entity: &'static str, id: i64) -> Error {
    warn!(entity, id, "Rejected delete of immutable record");
    Error::ImmutableRecord {
        entity,
        id,
        operation: "delete".to_string(),
    }
}

/// Reads the primary key out of an active model field.
pub fn primary_key(value: &ActiveValue<i64>, entity: &'static str) -> Result<i64> {
    match value {
        ActiveValue::Set(id) | ActiveValue::Unchanged(id) => Ok(*id),
        ActiveValue::NotSet => Err(Error::validation(
            "id",
            format!("{entity} update requires a primary key"),
        )),
    }
}

/// Rejects empty or whitespace-only text.
pub fn ensure_not_blank(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Rejects amounts below zero. Zero passes.
pub fn ensure_not_negative(field: &'static str, amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::validation(
            field,
            format!("must not be negative (got {amount})"),
        ));
    }
    Ok(())
}

/// Rejects zero and negative amounts.
pub fn ensure_positive_decimal(field: &'static str, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation(
            field,
            format!("must be greater than zero (got {amount})"),
        ));
    }
    Ok(())
}

/// Rejects zero and negative paise amounts.
pub fn ensure_positive_paise(field: &'static str, paise: i64) -> Result<()> {
    if paise <= 0 {
        return Err(Error::validation(
            field,
            format!("must be greater than zero (got {paise} paise)"),
        ));
    }
    Ok(())
}

/// `end` may equal `start` (a one-day window) but not precede it.
pub fn ensure_date_order(
    end_field: &'static str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    if end < start {
        return Err(Error::validation(
            end_field,
            format!("{end} is before the start date {start}"),
        ));
    }
    Ok(())
}
