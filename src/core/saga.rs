//! Saga execution tracking - recovery records for multi-step business transactions.
//!
//! The engine that actually runs sagas lives outside this crate. It calls these
//! functions to persist progress so that a crash can be recovered from:
//!
//! - [`start_saga`] creates a `pending` execution, [`begin_saga`] moves it to `in_progress`
//! - [`record_step`] appends completed steps with increasing step numbers
//! - [`complete_saga`] or [`fail_saga`] ends the forward run
//! - after a failure, [`record_compensation`] stores the outcome of undoing each
//!   completed step and [`mark_compensated`] closes the saga
//! - [`manually_resolve`] is the operator escape hatch for stuck sagas
//!
//! Executions and steps are audit records: they are never deleted, terminal
//! executions are frozen, failure details are kept forever, and steps only accept
//! compensation updates.

use crate::{
    core::guards,
    entities::{
        SagaExecution, SagaStep,
        saga_execution::{self, SagaStatus},
        saga_step::{self, CompensationStatus, StepStatus},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ActiveValue, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

const EXECUTION: &str = "saga_execution";
const STEP: &str = "saga_step";

/// Columns that never change after creation
const EXECUTION_FROZEN_COLUMNS: &[&str] = &["saga_type", "payload", "created_at"];
/// Columns a failed saga keeps forever
const FAILURE_COLUMNS: &[&str] = &["failed_step", "failure_reason"];
/// Columns written when a terminal saga is manually resolved
const RESOLUTION_COLUMNS: &[&str] = &["status", "resolved_by", "resolution_note", "finished_at"];
/// Columns of a step that may still be written after creation
const STEP_COMPENSATION_COLUMNS: &[&str] =
    &["compensation_status", "compensation_error", "compensated_at"];

/// Outcome of undoing one completed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensationOutcome {
    /// The step's effect was reversed
    Compensated,
    /// Reversal failed; the message is kept on the step
    Failed(String),
}

async fn find_execution<C>(db: &C, saga_id: i64) -> Result<saga_execution::Model>
where
    C: ConnectionTrait,
{
    SagaExecution::find_by_id(saga_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(EXECUTION, saga_id))
}

fn transition_error(from: SagaStatus, to: SagaStatus) -> Error {
    Error::validation(
        "status",
        format!("saga cannot move from {from:?} to {to:?}"),
    )
}

/// Creates a `pending` saga execution.
pub async fn start_saga(
    db: &DatabaseConnection,
    saga_type: &str,
    payload: Json,
) -> Result<saga_execution::Model> {
    guards::ensure_not_blank("saga_type", saga_type)?;

    let execution = saga_execution::ActiveModel {
        saga_type: Set(saga_type.trim().to_string()),
        status: Set(SagaStatus::Pending),
        payload: Set(payload),
        current_step: Set(0),
        failed_step: Set(None),
        failure_reason: Set(None),
        resolved_by: Set(None),
        resolution_note: Set(None),
        started_at: Set(None),
        finished_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let execution = execution.insert(db).await?;
    info!(saga_id = execution.id, saga_type = %execution.saga_type, "Saga created");
    Ok(execution)
}

/// Moves a `pending` saga to `in_progress`.
pub async fn begin_saga(db: &DatabaseConnection, saga_id: i64) -> Result<saga_execution::Model> {
    let execution = find_execution(db, saga_id).await?;
    let mut active: saga_execution::ActiveModel = execution.into();
    active.status = Set(SagaStatus::InProgress);
    active.started_at = Set(Some(Utc::now()));
    update_saga_execution(db, active).await
}

/// Appends a completed step to an `in_progress` saga.
///
/// The step number is the saga's `current_step + 1`, so steps are always stored
/// in increasing order without gaps.
#[instrument(skip(db, result))]
pub async fn record_step(
    db: &DatabaseConnection,
    saga_id: i64,
    name: &str,
    result: Json,
) -> Result<saga_step::Model> {
    guards::ensure_not_blank("name", name)?;

    let txn = db.begin().await?;
    let execution = find_execution(&txn, saga_id).await?;
    if execution.status != SagaStatus::InProgress {
        return Err(Error::validation(
            "status",
            format!("steps can only be recorded while in progress (saga is {:?})", execution.status),
        ));
    }

    let step_number = execution.current_step + 1;
    let step = saga_step::ActiveModel {
        saga_execution_id: Set(saga_id),
        step_number: Set(step_number),
        name: Set(name.trim().to_string()),
        status: Set(StepStatus::Completed),
        result: Set(result),
        error: Set(None),
        compensation_status: Set(CompensationStatus::NotRequired),
        compensation_error: Set(None),
        compensated_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active: saga_execution::ActiveModel = execution.into();
    active.current_step = Set(step_number);
    update_saga_execution(&txn, active).await?;

    txn.commit().await?;
    Ok(step)
}

/// Marks an `in_progress` saga as `completed`.
pub async fn complete_saga(db: &DatabaseConnection, saga_id: i64) -> Result<saga_execution::Model> {
    let execution = find_execution(db, saga_id).await?;
    let mut active: saga_execution::ActiveModel = execution.into();
    active.status = Set(SagaStatus::Completed);
    active.finished_at = Set(Some(Utc::now()));
    let execution = update_saga_execution(db, active).await?;
    info!(saga_id, "Saga completed");
    Ok(execution)
}

/// Records the failing step and moves an `in_progress` saga to `failed`.
///
/// The failing step is stored with status `failed` and the next step number;
/// that number and `reason` are kept on the execution permanently.
#[instrument(skip(db))]
pub async fn fail_saga(
    db: &DatabaseConnection,
    saga_id: i64,
    step_name: &str,
    reason: &str,
) -> Result<saga_execution::Model> {
    guards::ensure_not_blank("failure_reason", reason)?;

    let txn = db.begin().await?;
    let execution = find_execution(&txn, saga_id).await?;
    if !execution.status.can_transition_to(SagaStatus::Failed) {
        return Err(transition_error(execution.status, SagaStatus::Failed));
    }

    let step_number = execution.current_step + 1;
    saga_step::ActiveModel {
        saga_execution_id: Set(saga_id),
        step_number: Set(step_number),
        name: Set(step_name.trim().to_string()),
        status: Set(StepStatus::Failed),
        result: Set(Json::Null),
        error: Set(Some(reason.to_string())),
        compensation_status: Set(CompensationStatus::NotRequired),
        compensation_error: Set(None),
        compensated_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active: saga_execution::ActiveModel = execution.into();
    active.status = Set(SagaStatus::Failed);
    active.current_step = Set(step_number);
    active.failed_step = Set(Some(step_number));
    active.failure_reason = Set(Some(reason.to_string()));
    active.finished_at = Set(Some(Utc::now()));
    let execution = update_saga_execution(&txn, active).await?;

    txn.commit().await?;
    warn!(saga_id, step_number, reason, "Saga failed");
    Ok(execution)
}

/// Stores the outcome of compensating one completed step of a failed saga.
///
/// Only the compensation columns are written; the step's original result stays
/// as it was. A step whose compensation failed may be retried; a compensated
/// step may not be compensated again.
pub async fn record_compensation(
    db: &DatabaseConnection,
    step_id: i64,
    outcome: CompensationOutcome,
) -> Result<saga_step::Model> {
    let txn = db.begin().await?;
    let step = SagaStep::find_by_id(step_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(STEP, step_id))?;
    let execution = find_execution(&txn, step.saga_execution_id).await?;

    if execution.status != SagaStatus::Failed {
        return Err(Error::validation(
            "status",
            format!("only failed sagas are compensated (saga is {:?})", execution.status),
        ));
    }
    if step.status != StepStatus::Completed {
        return Err(Error::validation(
            "status",
            "only completed steps have an effect to compensate",
        ));
    }
    if step.compensation_status == CompensationStatus::Compensated {
        return Err(Error::validation(
            "compensation_status",
            format!("step {} is already compensated", step.step_number),
        ));
    }

    let mut active: saga_step::ActiveModel = step.into();
    match outcome {
        CompensationOutcome::Compensated => {
            active.compensation_status = Set(CompensationStatus::Compensated);
            active.compensation_error = Set(None);
            active.compensated_at = Set(Some(Utc::now()));
        }
        CompensationOutcome::Failed(message) => {
            active.compensation_status = Set(CompensationStatus::Failed);
            active.compensation_error = Set(Some(message));
        }
    }
    let step = update_saga_step(&txn, active).await?;
    txn.commit().await?;
    Ok(step)
}

/// Moves a failed saga to `compensated` once every completed step is compensated.
pub async fn mark_compensated(db: &DatabaseConnection, saga_id: i64) -> Result<saga_execution::Model> {
    let txn = db.begin().await?;
    let execution = find_execution(&txn, saga_id).await?;

    let outstanding = SagaStep::find()
        .filter(saga_step::Column::SagaExecutionId.eq(saga_id))
        .filter(saga_step::Column::Status.eq(StepStatus::Completed))
        .filter(saga_step::Column::CompensationStatus.ne(CompensationStatus::Compensated))
        .count(&txn)
        .await?;
    if outstanding > 0 {
        return Err(Error::validation(
            "status",
            format!("{outstanding} completed step(s) are not compensated yet"),
        ));
    }

    let mut active: saga_execution::ActiveModel = execution.into();
    active.status = Set(SagaStatus::Compensated);
    let execution = update_saga_execution(&txn, active).await?;
    txn.commit().await?;
    info!(saga_id, "Saga compensated");
    Ok(execution)
}

/// Operator escape hatch: closes a saga in any state except `manually_resolved`.
pub async fn manually_resolve(
    db: &DatabaseConnection,
    saga_id: i64,
    resolved_by: i64,
    note: &str,
) -> Result<saga_execution::Model> {
    guards::ensure_not_blank("resolution_note", note)?;

    let execution = find_execution(db, saga_id).await?;
    let mut active: saga_execution::ActiveModel = execution.into();
    active.status = Set(SagaStatus::ManuallyResolved);
    active.resolved_by = Set(Some(resolved_by));
    active.resolution_note = Set(Some(note.to_string()));
    active.finished_at = Set(Some(Utc::now()));
    let execution = update_saga_execution(db, active).await?;
    warn!(saga_id, resolved_by, "Saga manually resolved");
    Ok(execution)
}

/// Guarded update path for saga executions.
///
/// Rules, in order:
/// - `saga_type`, `payload` and `created_at` never change
/// - a terminal execution only accepts the move to `manually_resolved`
/// - a failed execution keeps `failed_step` and `failure_reason`
/// - a status change must be a legal transition
pub async fn update_saga_execution<C>(
    db: &C,
    active: saga_execution::ActiveModel,
) -> Result<saga_execution::Model>
where
    C: ConnectionTrait,
{
    let id = guards::primary_key(&active.id, EXECUTION)?;
    let current = find_execution(db, id).await?;
    let changed = guards::changed_columns(&active);
    if changed.is_empty() {
        return Ok(current);
    }

    if let Some(column) = changed.iter().find(|c| EXECUTION_FROZEN_COLUMNS.contains(&c.as_str())) {
        return Err(Error::ImmutableRecord {
            entity: EXECUTION,
            id,
            operation: format!("modify column `{column}`"),
        });
    }

    let next_status = match &active.status {
        ActiveValue::Set(status) => Some(*status),
        _ => None,
    };

    if current.status.is_terminal() {
        if next_status != Some(SagaStatus::ManuallyResolved)
            || current.status == SagaStatus::ManuallyResolved
        {
            warn!(saga_id = id, status = ?current.status, "Rejected update of terminal saga");
            return Err(Error::ImmutableRecord {
                entity: EXECUTION,
                id,
                operation: format!("modify a {:?} saga", current.status),
            });
        }
        guards::ensure_only_columns(EXECUTION, id, &changed, RESOLUTION_COLUMNS)?;
    }

    if current.failed_step.is_some() || current.failure_reason.is_some() {
        if let Some(column) = changed.iter().find(|c| FAILURE_COLUMNS.contains(&c.as_str())) {
            return Err(Error::ImmutableRecord {
                entity: EXECUTION,
                id,
                operation: format!("modify column `{column}` after failure"),
            });
        }
    }

    if let Some(next) = next_status {
        if next != current.status && !current.status.can_transition_to(next) {
            return Err(transition_error(current.status, next));
        }
    }

    active.update(db).await.map_err(Into::into)
}

/// Guarded update path for saga steps: only compensation columns may change.
pub async fn update_saga_step<C>(db: &C, active: saga_step::ActiveModel) -> Result<saga_step::Model>
where
    C: ConnectionTrait,
{
    let id = guards::primary_key(&active.id, STEP)?;
    let current = SagaStep::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(STEP, id))?;
    let changed = guards::changed_columns(&active);
    if changed.is_empty() {
        return Ok(current);
    }
    guards::ensure_only_columns(STEP, id, &changed, STEP_COMPENSATION_COLUMNS)?;
    active.update(db).await.map_err(Into::into)
}

/// Guarded delete path. Always fails for an existing execution.
pub async fn delete_saga_execution<C>(db: &C, saga_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    find_execution(db, saga_id).await?;
    Err(guards::delete_rejected(EXECUTION, saga_id))
}

/// Guarded delete path. Always fails for an existing step.
pub async fn delete_saga_step<C>(db: &C, step_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    SagaStep::find_by_id(step_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(STEP, step_id))?;
    Err(guards::delete_rejected(STEP, step_id))
}

/// Steps of a saga in execution order.
pub async fn steps_for_saga(db: &DatabaseConnection, saga_id: i64) -> Result<Vec<saga_step::Model>> {
    SagaStep::find()
        .filter(saga_step::Column::SagaExecutionId.eq(saga_id))
        .order_by_asc(saga_step::Column::StepNumber)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sagas created before `cutoff` that are still in progress or failed without
/// being compensated; candidates for recovery or manual resolution.
pub async fn stuck_sagas(
    db: &DatabaseConnection,
    cutoff: DateTimeUtc,
) -> Result<Vec<saga_execution::Model>> {
    SagaExecution::find()
        .filter(
            saga_execution::Column::Status.is_in([SagaStatus::InProgress, SagaStatus::Failed]),
        )
        .filter(saga_execution::Column::CreatedAt.lt(cutoff))
        .order_by_asc(saga_execution::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}
