//! User agreement signature entity - Evidence that a user accepted a specific agreement version.
//!
//! Write-once: the forensic fields (IP address, user agent, version) are legal
//! evidence and are never rewritten. There is no `updated_at` column.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User agreement signature database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_agreement_signatures")]
pub struct Model {
    /// Unique identifier for the user agreement signature
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Signer
    pub user_id: i64,
    /// Agreement version signed
    pub legal_agreement_id: i64,
    /// Version label copied from the agreement at signing time
    pub agreement_version: String,
    /// Client IP address supplied by the request layer
    pub ip_address: Option<String>,
    /// Client user agent supplied by the request layer
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    /// When the user signed (creation time)
    pub signed_at: DateTimeUtc,
}

/// Defines relationships between `UserAgreementSignature` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each signature belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each signature belongs to one agreement version
    #[sea_orm(
        belongs_to = "super::legal_agreement::Entity",
        from = "Column::LegalAgreementId",
        to = "super::legal_agreement::Column::Id"
    )]
    Agreement,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::legal_agreement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agreement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
