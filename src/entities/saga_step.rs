//! Saga step entity - One executed step of a saga, appended in step order.
//!
//! Write-once except for the compensation columns, which the engine fills in
//! when it unwinds a failed saga.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of a step
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step succeeded
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Step failed
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Whether a step's effect has been undone
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CompensationStatus {
    /// Nothing to undo yet
    #[sea_orm(string_value = "not_required")]
    NotRequired,
    /// Effect undone
    #[sea_orm(string_value = "compensated")]
    Compensated,
    /// Undo attempt failed
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Saga step database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "saga_steps")]
pub struct Model {
    /// Unique identifier for the saga step
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Saga the step belongs to
    pub saga_execution_id: i64,
    /// 1-based position in the saga
    pub step_number: i32,
    /// Step name, e.g. `"reserve_allocation"`
    pub name: String,
    /// Outcome of the step
    pub status: StepStatus,
    /// Output of the step, needed to compensate it
    pub result: Json,
    /// Error message when the step failed
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,
    /// Where compensation stands
    pub compensation_status: CompensationStatus,
    /// Error message when compensation failed
    #[sea_orm(column_type = "Text", nullable)]
    pub compensation_error: Option<String>,
    /// When the step was compensated
    pub compensated_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `SagaStep` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each step belongs to one saga
    #[sea_orm(
        belongs_to = "super::saga_execution::Entity",
        from = "Column::SagaExecutionId",
        to = "super::saga_execution::Column::Id"
    )]
    SagaExecution,
}

impl Related<super::saga_execution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SagaExecution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
