//! Corporate action entity - Dividends, bonus issues, splits and buybacks
//! scheduled against a company and executed once.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of corporate action
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Cash paid per share
    #[sea_orm(string_value = "dividend")]
    Dividend,
    /// Free shares issued per share held
    #[sea_orm(string_value = "bonus_issue")]
    BonusIssue,
    /// Shares divided by a ratio
    #[sea_orm(string_value = "split")]
    Split,
    /// Company buys shares back
    #[sea_orm(string_value = "buyback")]
    Buyback,
}

/// Lifecycle of a corporate action
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Announced, not yet applied
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    /// Applied to holdings
    #[sea_orm(string_value = "executed")]
    Executed,
    /// Withdrawn before execution
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Corporate action database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "corporate_actions")]
pub struct Model {
    /// Unique identifier for the corporate action
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company taking the action
    pub company_id: i64,
    /// Kind of action
    pub action_type: ActionType,
    /// Shareholders on record at this date participate
    pub record_date: Date,
    /// Cash per share for dividends/buybacks, ratio for issues and splits
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub value_per_share: Decimal,
    /// Where the action is in its lifecycle
    pub status: ActionStatus,
    /// When the action was executed
    pub executed_at: Option<DateTimeUtc>,
    /// Staff member who executed it
    pub executed_by: Option<i64>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `CorporateAction` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each action belongs to one company
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
