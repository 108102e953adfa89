//! Saga execution entity - Recovery record for a multi-step business transaction.
//!
//! Status moves `pending -> in_progress -> completed | failed`, then a failed saga
//! may become `compensated`. `manually_resolved` can be reached from any other
//! state. See `core::saga` for the transition and immutability rules.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Saga lifecycle state
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    /// Created, not started
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Steps are running
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Every step succeeded
    #[sea_orm(string_value = "completed")]
    Completed,
    /// A step failed
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Completed steps were undone after a failure
    #[sea_orm(string_value = "compensated")]
    Compensated,
    /// Closed by staff after a failure
    #[sea_orm(string_value = "manually_resolved")]
    ManuallyResolved,
}

impl SagaStatus {
    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Completed | Self::Failed)
                | (Self::Failed, Self::Compensated)
                | (
                    Self::Pending
                        | Self::InProgress
                        | Self::Completed
                        | Self::Failed
                        | Self::Compensated,
                    Self::ManuallyResolved
                )
        )
    }

    /// Terminal states freeze the record; only `manually_resolved` may still be applied.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Compensated | Self::ManuallyResolved
        )
    }
}

/// Saga execution database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "saga_executions")]
pub struct Model {
    /// Unique identifier for the saga execution
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Saga name, e.g. `"investment.checkout"`
    pub saga_type: String,
    /// Where the saga is in its lifecycle
    pub status: SagaStatus,
    /// Input the saga was started with
    pub payload: Json,
    /// Highest step number recorded so far, 0 before the first step
    pub current_step: i32,
    /// Step number that failed; kept forever once set
    pub failed_step: Option<i32>,
    /// Failure reason; kept forever once set
    #[sea_orm(column_type = "Text", nullable)]
    pub failure_reason: Option<String>,
    /// Operator who resolved a stuck saga
    pub resolved_by: Option<i64>,
    /// Staff note recorded on manual resolution
    #[sea_orm(column_type = "Text", nullable)]
    pub resolution_note: Option<String>,
    /// When the first step started
    pub started_at: Option<DateTimeUtc>,
    /// When the saga reached a terminal state
    pub finished_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `SagaExecution` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One saga has many steps
    #[sea_orm(has_many = "super::saga_step::Entity")]
    Steps,
}

impl Related<super::saga_step::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Steps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saga_transitions() {
        assert!(SagaStatus::Pending.can_transition_to(SagaStatus::InProgress));
        assert!(SagaStatus::InProgress.can_transition_to(SagaStatus::Failed));
        assert!(SagaStatus::Failed.can_transition_to(SagaStatus::Compensated));
        assert!(SagaStatus::Completed.can_transition_to(SagaStatus::ManuallyResolved));
        assert!(SagaStatus::Compensated.can_transition_to(SagaStatus::ManuallyResolved));

        assert!(!SagaStatus::Pending.can_transition_to(SagaStatus::Completed));
        assert!(!SagaStatus::Completed.can_transition_to(SagaStatus::Failed));
        assert!(!SagaStatus::Completed.can_transition_to(SagaStatus::Compensated));
        assert!(!SagaStatus::ManuallyResolved.can_transition_to(SagaStatus::ManuallyResolved));
        assert!(!SagaStatus::InProgress.can_transition_to(SagaStatus::Compensated));
    }

    #[test]
    fn test_terminal_states() {
        assert!(SagaStatus::Completed.is_terminal());
        assert!(SagaStatus::Compensated.is_terminal());
        assert!(SagaStatus::ManuallyResolved.is_terminal());
        assert!(!SagaStatus::Failed.is_terminal());
        assert!(!SagaStatus::InProgress.is_terminal());
    }
}
