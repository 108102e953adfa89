//! Legal agreements and the signatures users put on them.
//!
//! Each published version is its own row; publishing a new version of a kind
//! deactivates the previous one. Signatures are legal evidence and are
//! write-once: they record the exact version, IP address and user agent.

use crate::{
    core::{audit::RequestContext, guards, slug},
    entities::{
        LegalAgreement, UserAgreementSignature,
        legal_agreement::{self, AgreementKind},
        user_agreement_signature,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

const AGREEMENT: &str = "legal_agreement";
const SIGNATURE: &str = "user_agreement_signature";

/// Publishes a new active version and retires older versions of the same kind.
pub async fn publish_agreement(
    db: &DatabaseConnection,
    kind: AgreementKind,
    title: &str,
    version: &str,
    body: &str,
    effective_on: NaiveDate,
) -> Result<legal_agreement::Model> {
    guards::ensure_not_blank("title", title)?;
    guards::ensure_not_blank("version", version)?;
    guards::ensure_not_blank("body", body)?;

    let txn = db.begin().await?;
    let duplicate = LegalAgreement::find()
        .filter(legal_agreement::Column::Kind.eq(kind))
        .filter(legal_agreement::Column::Version.eq(version.trim()))
        .count(&txn)
        .await?;
    if duplicate > 0 {
        return Err(Error::validation("version", format!("version {version} already exists")));
    }

    LegalAgreement::update_many()
        .col_expr(legal_agreement::Column::IsActive, Expr::value(false))
        .col_expr(legal_agreement::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(legal_agreement::Column::Kind.eq(kind))
        .filter(legal_agreement::Column::IsActive.eq(true))
        .exec(&txn)
        .await?;

    let base = slug::slugify(&format!("{title} {version}"));
    let slug = slug::unique_slug::<LegalAgreement, _>(&txn, legal_agreement::Column::Slug, &base).await?;
    let now = Utc::now();
    let agreement = legal_agreement::ActiveModel {
        kind: Set(kind),
        title: Set(title.trim().to_string()),
        slug: Set(slug),
        version: Set(version.trim().to_string()),
        body: Set(body.to_string()),
        is_active: Set(true),
        effective_on: Set(effective_on),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(agreement_id = agreement.id, ?kind, version = %agreement.version, "Agreement published");
    Ok(agreement)
}

/// The version of `kind` users currently have to accept.
pub async fn active_agreement<C>(db: &C, kind: AgreementKind) -> Result<Option<legal_agreement::Model>>
where
    C: ConnectionTrait,
{
    LegalAgreement::find()
        .filter(legal_agreement::Column::Kind.eq(kind))
        .filter(legal_agreement::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Records that the user accepted an active agreement. Each version is signed
/// at most once per user.
pub async fn sign_agreement(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    user_id: i64,
    agreement_id: i64,
) -> Result<user_agreement_signature::Model> {
    let txn = db.begin().await?;
    let agreement = LegalAgreement::find_by_id(agreement_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(AGREEMENT, agreement_id))?;
    if !agreement.is_active {
        return Err(Error::validation("legal_agreement_id", "only the active version can be signed"));
    }

    let signed = UserAgreementSignature::find()
        .filter(user_agreement_signature::Column::UserId.eq(user_id))
        .filter(user_agreement_signature::Column::LegalAgreementId.eq(agreement_id))
        .count(&txn)
        .await?;
    if signed > 0 {
        return Err(Error::validation("legal_agreement_id", "agreement already signed"));
    }

    let signature = user_agreement_signature::ActiveModel {
        user_id: Set(user_id),
        legal_agreement_id: Set(agreement_id),
        agreement_version: Set(agreement.version.clone()),
        ip_address: Set(ctx.ip_address.clone()),
        user_agent: Set(ctx.user_agent.clone()),
        signed_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    info!(user_id, agreement_id, version = %agreement.version, "Agreement signed");
    Ok(signature)
}

/// Whether the user has signed the active version of `kind`. With no active
/// version there is nothing to sign, so the answer is true.
pub async fn has_signed_current(db: &DatabaseConnection, user_id: i64, kind: AgreementKind) -> Result<bool> {
    let Some(agreement) = active_agreement(db, kind).await? else {
        return Ok(true);
    };
    let signed = UserAgreementSignature::find()
        .filter(user_agreement_signature::Column::UserId.eq(user_id))
        .filter(user_agreement_signature::Column::LegalAgreementId.eq(agreement.id))
        .count(db)
        .await?;
    Ok(signed > 0)
}

/// Every agreement version the user has signed, in signing order.
pub async fn signatures_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<user_agreement_signature::Model>> {
    UserAgreementSignature::find()
        .filter(user_agreement_signature::Column::UserId.eq(user_id))
        .order_by_asc(user_agreement_signature::Column::SignedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Guarded update path. Signatures accept no changes.
pub async fn update_signature<C>(
    db: &C,
    active: user_agreement_signature::ActiveModel,
) -> Result<user_agreement_signature::Model>
where
    C: ConnectionTrait,
{
    let id = guards::primary_key(&active.id, SIGNATURE)?;
    let current = UserAgreementSignature::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(SIGNATURE, id))?;
    guards::ensure_only_columns(SIGNATURE, id, &guards::changed_columns(&active), &[])?;
    Ok(current)
}

/// Guarded delete path. Always fails for an existing signature.
pub async fn delete_signature<C>(db: &C, id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    UserAgreementSignature::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(SIGNATURE, id))?;
    Err(guards::delete_rejected(SIGNATURE, id))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn effective() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    #[tokio::test]
    async fn test_new_version_requires_new_signature() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "investor@example.com").await?;
        let ctx = RequestContext {
            actor_id: Some(user.id),
            ip_address: Some("198.51.100.4".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        assert!(has_signed_current(&db, user.id, AgreementKind::TermsOfService).await?);

        let v1 = publish_agreement(&db, AgreementKind::TermsOfService, "Terms of Service", "1.0", "...", effective()).await?;
        assert_eq!(v1.slug, "terms-of-service-1-0");
        assert!(!has_signed_current(&db, user.id, AgreementKind::TermsOfService).await?);

        let signature = sign_agreement(&db, &ctx, user.id, v1.id).await?;
        assert_eq!(signature.agreement_version, "1.0");
        assert_eq!(signature.ip_address.as_deref(), Some("198.51.100.4"));
        assert!(has_signed_current(&db, user.id, AgreementKind::TermsOfService).await?);
        assert!(sign_agreement(&db, &ctx, user.id, v1.id).await.is_err());

        let v2 = publish_agreement(&db, AgreementKind::TermsOfService, "Terms of Service", "2.0", "...", effective()).await?;
        assert!(!has_signed_current(&db, user.id, AgreementKind::TermsOfService).await?);
        assert_eq!(active_agreement(&db, AgreementKind::TermsOfService).await?.unwrap().id, v2.id);

        let stale = sign_agreement(&db, &ctx, user.id, v1.id).await;
        assert!(matches!(stale, Err(Error::Validation { field: "legal_agreement_id", .. })));

        sign_agreement(&db, &ctx, user.id, v2.id).await?;
        assert_eq!(signatures_for_user(&db, user.id).await?.len(), 2);

        let duplicate = publish_agreement(&db, AgreementKind::TermsOfService, "Terms", "2.0", "...", effective()).await;
        assert!(matches!(duplicate, Err(Error::Validation { field: "version", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_signatures_are_immutable() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "investor@example.com").await?;
        let agreement = publish_agreement(&db, AgreementKind::RiskDisclosure, "Risk Disclosure", "1", "...", effective()).await?;
        let signature = sign_agreement(&db, &RequestContext::for_user(user.id), user.id, agreement.id).await?;

        let mut active: user_agreement_signature::ActiveModel = signature.clone().into();
        active.agreement_version = Set("9.9".to_string());
        assert!(matches!(
            update_signature(&db, active).await,
            Err(Error::ImmutableRecord { entity: "user_agreement_signature", .. })
        ));
        assert!(matches!(
            delete_signature(&db, signature.id).await,
            Err(Error::ImmutableRecord { .. })
        ));
        assert!(matches!(delete_signature(&db, 404).await, Err(Error::NotFound { .. })));

        let stored = UserAgreementSignature::find_by_id(signature.id).one(&db).await?.unwrap();
        assert_eq!(stored.agreement_version, "1");
        Ok(())
    }
}
