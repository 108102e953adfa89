//! Deal entity - A fundraising round opened by a company.
//!
//! Amounts are kept in paise. `raised_amount_paise` is a cached running total
//! moved atomically when investments are confirmed or refunded.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a deal
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    /// Being prepared, not visible
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Open for investment
    #[sea_orm(string_value = "live")]
    Live,
    /// Round finished
    #[sea_orm(string_value = "closed")]
    Closed,
    /// Withdrawn
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Deal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deals")]
pub struct Model {
    /// Unique identifier for the deal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company raising the round
    pub company_id: i64,
    /// Sector the deal is listed under
    pub sector_id: Option<i64>,
    /// Listing title
    pub title: String,
    /// URL-safe identifier derived from the title
    #[sea_orm(unique)]
    pub slug: String,
    /// Smallest ticket accepted, in paise
    pub min_investment_paise: i64,
    /// Fundraising goal, in paise
    pub target_amount_paise: i64,
    /// Sum of confirmed investments, in paise
    pub raised_amount_paise: i64,
    /// Where the deal is in its lifecycle
    pub status: DealStatus,
    /// First day investments are accepted
    pub opens_on: Date,
    /// Last day investments are accepted
    pub closes_on: Date,
    /// Soft delete flag - if true, deal is hidden but data is preserved
    pub is_deleted: bool,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Deal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each deal belongs to one company
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
    /// Each deal may be listed under one sector
    #[sea_orm(
        belongs_to = "super::sector::Entity",
        from = "Column::SectorId",
        to = "super::sector::Column::Id"
    )]
    Sector,
    /// One deal has many investments
    #[sea_orm(has_many = "super::investment::Entity")]
    Investments,
    /// One deal has many listing activity entries
    #[sea_orm(has_many = "super::listing_activity::Entity")]
    Activities,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::sector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sector.def()
    }
}

impl Related<super::investment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Investments.def()
    }
}

impl Related<super::listing_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activities.def()
    }
}

impl Model {
    /// Amount still needed to reach the target, never negative.
    #[must_use]
    pub fn remaining_paise(&self) -> i64 {
        (self.target_amount_paise - self.raised_amount_paise).max(0)
    }

    /// Whether the deal accepts investments on `date`.
    #[must_use]
    pub fn is_open_on(&self, date: Date) -> bool {
        self.status == DealStatus::Live
            && !self.is_deleted
            && self.opens_on <= date
            && date <= self.closes_on
    }
}

impl ActiveModelBehavior for ActiveModel {}
