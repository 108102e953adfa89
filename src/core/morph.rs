//! Polymorphic references as a tagged union.
//!
//! A polymorphic column pair (`*_type`, `*_id`) is read into a [`MorphRef`] and
//! resolved through [`resolve`], which is the single lookup table from
//! discriminant to entity. Each polymorphic relation lists the discriminants it
//! accepts so a campaign usage can never point at, say, a support ticket.

use crate::{
    entities::{
        Company, Deal, Investment, KycRecord, LegalAgreement, Payment, Subscription,
        SupportTicket, User, company, deal, investment, kyc_record, legal_agreement, payment,
        subscription, support_ticket, user,
    },
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};

pub use crate::entities::morph::MorphType;

/// Targets a campaign discount can apply to
pub const CAMPAIGN_APPLICABLE: &[MorphType] = &[
    MorphType::Investment,
    MorphType::Subscription,
    MorphType::Payment,
];

/// Records an activity log entry may point at
pub const AUDIT_SUBJECTS: &[MorphType] = &[
    MorphType::User,
    MorphType::Company,
    MorphType::Deal,
    MorphType::Investment,
    MorphType::Subscription,
    MorphType::Payment,
    MorphType::KycRecord,
    MorphType::SupportTicket,
    MorphType::LegalAgreement,
];

/// Discriminant plus id, as stored in a polymorphic column pair
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MorphRef {
    /// Which table the id points into
    pub kind: MorphType,
    /// Primary key in that table
    pub id: i64,
}

impl MorphRef {
    /// Pairs a kind with an id.
    #[must_use]
    pub const fn new(kind: MorphType, id: i64) -> Self {
        Self { kind, id }
    }

    /// Rebuilds a reference from nullable columns; both halves must be present.
    #[must_use]
    pub const fn from_columns(kind: Option<MorphType>, id: Option<i64>) -> Option<Self> {
        match (kind, id) {
            (Some(kind), Some(id)) => Some(Self { kind, id }),
            _ => None,
        }
    }

    /// Fails with a validation error unless `self.kind` is one of `accepted`.
    pub fn ensure_accepted(&self, field: &'static str, accepted: &[MorphType]) -> Result<()> {
        if accepted.contains(&self.kind) {
            return Ok(());
        }
        Err(Error::validation(
            field,
            format!("`{}` is not an accepted target here", self.kind.as_str()),
        ))
    }
}

/// A resolved polymorphic target
#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum MorphRecord {
    /// A user row
    User(user::Model),
    /// A company row
    Company(company::Model),
    /// A deal row
    Deal(deal::Model),
    /// An investment row
    Investment(investment::Model),
    /// A subscription row
    Subscription(subscription::Model),
    /// A payment row
    Payment(payment::Model),
    /// A KYC record row
    KycRecord(kyc_record::Model),
    /// A support ticket row
    SupportTicket(support_ticket::Model),
    /// A legal agreement row
    LegalAgreement(legal_agreement::Model),
}

impl MorphRecord {
    /// Reference that would resolve back to this record.
    #[must_use]
    pub const fn morph_ref(&self) -> MorphRef {
        match self {
            Self::User(m) => MorphRef::new(MorphType::User, m.id),
            Self::Company(m) => MorphRef::new(MorphType::Company, m.id),
            Self::Deal(m) => MorphRef::new(MorphType::Deal, m.id),
            Self::Investment(m) => MorphRef::new(MorphType::Investment, m.id),
            Self::Subscription(m) => MorphRef::new(MorphType::Subscription, m.id),
            Self::Payment(m) => MorphRef::new(MorphType::Payment, m.id),
            Self::KycRecord(m) => MorphRef::new(MorphType::KycRecord, m.id),
            Self::SupportTicket(m) => MorphRef::new(MorphType::SupportTicket, m.id),
            Self::LegalAgreement(m) => MorphRef::new(MorphType::LegalAgreement, m.id),
        }
    }
}

/// Loads the row a polymorphic reference points at, None if it no longer exists.
pub async fn resolve<C>(db: &C, target: MorphRef) -> Result<Option<MorphRecord>>
where
    C: ConnectionTrait,
{
    let id = target.id;
    let record = match target.kind {
        MorphType::User => User::find_by_id(id).one(db).await?.map(MorphRecord::User),
        MorphType::Company => Company::find_by_id(id)
            .one(db)
            .await?
            .map(MorphRecord::Company),
        MorphType::Deal => Deal::find_by_id(id).one(db).await?.map(MorphRecord::Deal),
        MorphType::Investment => Investment::find_by_id(id)
            .one(db)
            .await?
            .map(MorphRecord::Investment),
        MorphType::Subscription => Subscription::find_by_id(id)
            .one(db)
            .await?
            .map(MorphRecord::Subscription),
        MorphType::Payment => Payment::find_by_id(id)
            .one(db)
            .await?
            .map(MorphRecord::Payment),
        MorphType::KycRecord => KycRecord::find_by_id(id)
            .one(db)
            .await?
            .map(MorphRecord::KycRecord),
        MorphType::SupportTicket => SupportTicket::find_by_id(id)
            .one(db)
            .await?
            .map(MorphRecord::SupportTicket),
        MorphType::LegalAgreement => LegalAgreement::find_by_id(id)
            .one(db)
            .await?
            .map(MorphRecord::LegalAgreement),
    };
    Ok(record)
}

/// Like [`resolve`] but a dangling reference is an error.
pub async fn resolve_existing<C>(db: &C, target: MorphRef) -> Result<MorphRecord>
where
    C: ConnectionTrait,
{
    resolve(db, target)
        .await?
        .ok_or_else(|| Error::not_found(target.kind.as_str(), target.id))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_from_columns_requires_both_halves() {
        assert_eq!(
            MorphRef::from_columns(Some(MorphType::Deal), Some(4)),
            Some(MorphRef::new(MorphType::Deal, 4))
        );
        assert_eq!(MorphRef::from_columns(Some(MorphType::Deal), None), None);
        assert_eq!(MorphRef::from_columns(None, Some(4)), None);
    }

    #[test]
    fn test_ensure_accepted() {
        let target = MorphRef::new(MorphType::Payment, 1);
        assert!(target.ensure_accepted("applicable", CAMPAIGN_APPLICABLE).is_ok());

        let target = MorphRef::new(MorphType::SupportTicket, 1);
        assert!(matches!(
            target.ensure_accepted("applicable", CAMPAIGN_APPLICABLE),
            Err(Error::Validation { field: "applicable", .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_round_trips_through_discriminant() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "morph@example.com").await?;
        let company = create_test_company(&db, user.id, "Morph Labs").await?;

        let resolved = resolve(&db, MorphRef::new(MorphType::Company, company.id))
            .await?
            .unwrap();
        assert!(matches!(&resolved, MorphRecord::Company(c) if c.name == "Morph Labs"));
        assert_eq!(resolved.morph_ref(), MorphRef::new(MorphType::Company, company.id));

        let resolved = resolve(&db, MorphRef::new(MorphType::User, user.id)).await?;
        assert!(matches!(resolved, Some(MorphRecord::User(_))));

        let missing = resolve(&db, MorphRef::new(MorphType::Deal, 404)).await?;
        assert!(missing.is_none());

        let err = resolve_existing(&db, MorphRef::new(MorphType::Deal, 404)).await;
        assert!(matches!(err, Err(Error::NotFound { entity: "deal", id: 404 })));
        Ok(())
    }
}
