//! Know-your-customer verification records and their documents.
//!
//! `pending -> under_review -> approved | rejected`. A rejected user opens a new
//! record rather than editing the old one, so the history of reviews is kept.

use crate::{
    core::{
        audit::{self, RequestContext},
        guards,
        morph::{MorphRef, MorphType},
    },
    entities::{
        KycDocument, KycRecord,
        kyc_document::{self, DocumentStatus, KycDocumentType},
        kyc_record::{self, KycStatus},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::json;
use tracing::{info, warn};

const RECORD: &str = "kyc_record";
const DOCUMENT: &str = "kyc_document";

async fn find_record<C>(db: &C, id: i64) -> Result<kyc_record::Model>
where
    C: ConnectionTrait,
{
    KycRecord::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(RECORD, id))
}

fn ensure_status(record: &kyc_record::Model, expected: KycStatus, operation: &str) -> Result<()> {
    if record.status != expected {
        return Err(Error::validation(
            "status",
            format!("cannot {operation} a KYC record that is {:?}", record.status),
        ));
    }
    Ok(())
}

/// PAN is five letters, four digits, one letter.
fn validate_pan(pan: &str) -> Result<()> {
    let bytes = pan.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[..5].iter().all(u8::is_ascii_uppercase)
        && bytes[5..9].iter().all(u8::is_ascii_digit)
        && bytes[9].is_ascii_uppercase();
    if !well_formed {
        return Err(Error::validation("pan_number", format!("`{pan}` is not a valid PAN")));
    }
    Ok(())
}

/// Opens a new pending record. Only one record per user may be pending or
/// under review at a time.
pub async fn open_kyc_record(
    db: &DatabaseConnection,
    user_id: i64,
    pan_number: Option<String>,
) -> Result<kyc_record::Model> {
    let pan_number = pan_number.map(|pan| pan.trim().to_uppercase());
    if let Some(pan) = &pan_number {
        validate_pan(pan)?;
    }

    let in_flight = KycRecord::find()
        .filter(kyc_record::Column::UserId.eq(user_id))
        .filter(kyc_record::Column::Status.is_in([KycStatus::Pending, KycStatus::UnderReview]))
        .count(db)
        .await?;
    if in_flight > 0 {
        return Err(Error::validation("user_id", "a KYC record is already in progress"));
    }

    let now = Utc::now();
    let record = kyc_record::ActiveModel {
        user_id: Set(user_id),
        status: Set(KycStatus::Pending),
        pan_number: Set(pan_number),
        rejection_reason: Set(None),
        reviewed_by: Set(None),
        submitted_at: Set(None),
        verified_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(kyc_record_id = record.id, user_id, "KYC record opened");
    Ok(record)
}

/// Attaches a document to a pending record.
pub async fn upload_kyc_document(
    db: &DatabaseConnection,
    record_id: i64,
    document_type: KycDocumentType,
    file_path: &str,
    uploaded_by: i64,
) -> Result<kyc_document::Model> {
    guards::ensure_not_blank("file_path", file_path)?;
    let record = find_record(db, record_id).await?;
    ensure_status(&record, KycStatus::Pending, "add documents to")?;

    let now = Utc::now();
    kyc_document::ActiveModel {
        kyc_record_id: Set(record_id),
        document_type: Set(document_type),
        file_path: Set(file_path.to_string()),
        uploaded_by: Set(uploaded_by),
        status: Set(DocumentStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Accepts or rejects one document.
pub async fn review_document(
    db: &DatabaseConnection,
    document_id: i64,
    status: DocumentStatus,
) -> Result<kyc_document::Model> {
    if status == DocumentStatus::Pending {
        return Err(Error::validation("status", "a review must accept or reject"));
    }
    let document = KycDocument::find_by_id(document_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(DOCUMENT, document_id))?;
    let mut active: kyc_document::ActiveModel = document.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Sends a pending record with at least one document to review.
pub async fn submit_for_review(db: &DatabaseConnection, record_id: i64) -> Result<kyc_record::Model> {
    let txn = db.begin().await?;
    let record = find_record(&txn, record_id).await?;
    ensure_status(&record, KycStatus::Pending, "submit")?;

    let documents = KycDocument::find()
        .filter(kyc_document::Column::KycRecordId.eq(record_id))
        .count(&txn)
        .await?;
    if documents == 0 {
        return Err(Error::validation("documents", "upload at least one document first"));
    }

    let mut active: kyc_record::ActiveModel = record.into();
    active.status = Set(KycStatus::UnderReview);
    active.submitted_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let record = active.update(&txn).await?;
    txn.commit().await?;
    Ok(record)
}

/// Approves a record under review.
pub async fn approve_kyc(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    record_id: i64,
    reviewer_id: i64,
) -> Result<kyc_record::Model> {
    let txn = db.begin().await?;
    let record = find_record(&txn, record_id).await?;
    ensure_status(&record, KycStatus::UnderReview, "approve")?;

    let mut active: kyc_record::ActiveModel = record.into();
    active.status = Set(KycStatus::Approved);
    active.reviewed_by = Set(Some(reviewer_id));
    active.verified_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let record = active.update(&txn).await?;

    audit::record_activity(
        &txn,
        ctx,
        "kyc.approved",
        Some(MorphRef::new(MorphType::KycRecord, record_id)),
        json!({ "user_id": record.user_id }),
    )
    .await?;
    txn.commit().await?;
    info!(kyc_record_id = record_id, reviewer_id, "KYC approved");
    Ok(record)
}

/// Rejects a record under review. A reason is required.
pub async fn reject_kyc(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    record_id: i64,
    reviewer_id: i64,
    reason: &str,
) -> Result<kyc_record::Model> {
    guards::ensure_not_blank("rejection_reason", reason)?;

    let txn = db.begin().await?;
    let record = find_record(&txn, record_id).await?;
    ensure_status(&record, KycStatus::UnderReview, "reject")?;

    let mut active: kyc_record::ActiveModel = record.into();
    active.status = Set(KycStatus::Rejected);
    active.reviewed_by = Set(Some(reviewer_id));
    active.rejection_reason = Set(Some(reason.to_string()));
    active.updated_at = Set(Utc::now());
    let record = active.update(&txn).await?;

    audit::record_activity(
        &txn,
        ctx,
        "kyc.rejected",
        Some(MorphRef::new(MorphType::KycRecord, record_id)),
        json!({ "user_id": record.user_id, "reason": reason }),
    )
    .await?;
    txn.commit().await?;
    warn!(kyc_record_id = record_id, reviewer_id, reason, "KYC rejected");
    Ok(record)
}

/// Documents uploaded against a KYC record.
pub async fn documents_for_record(db: &DatabaseConnection, record_id: i64) -> Result<Vec<kyc_document::Model>> {
    KycDocument::find()
        .filter(kyc_document::Column::KycRecordId.eq(record_id))
        .order_by_asc(kyc_document::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The user's most recent record.
pub async fn latest_kyc_for_user(db: &DatabaseConnection, user_id: i64) -> Result<Option<kyc_record::Model>> {
    KycRecord::find()
        .filter(kyc_record::Column::UserId.eq(user_id))
        .order_by_desc(kyc_record::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_pan_format() {
        assert!(validate_pan("ABCDE1234F").is_ok());
        assert!(validate_pan("ABCD1234F").is_err());
        assert!(validate_pan("abcde1234f").is_err());
        assert!(validate_pan("ABCDE12345").is_err());
    }

    #[tokio::test]
    async fn test_approval_flow() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "investor@example.com").await?;
        let reviewer = create_test_admin(&db, "compliance@example.com").await?;
        let ctx = RequestContext::for_user(reviewer.id);

        let record = open_kyc_record(&db, user.id, Some("abcde1234f".to_string())).await?;
        assert_eq!(record.pan_number.as_deref(), Some("ABCDE1234F"));

        let empty = submit_for_review(&db, record.id).await;
        assert!(matches!(empty, Err(Error::Validation { field: "documents", .. })));

        let doc = upload_kyc_document(&db, record.id, KycDocumentType::PanCard, "kyc/pan.jpg", user.id).await?;
        let record = submit_for_review(&db, record.id).await?;
        assert_eq!(record.status, KycStatus::UnderReview);
        assert!(record.submitted_at.is_some());

        let late = upload_kyc_document(&db, record.id, KycDocumentType::Photo, "kyc/me.jpg", user.id).await;
        assert!(matches!(late, Err(Error::Validation { field: "status", .. })));

        review_document(&db, doc.id, DocumentStatus::Accepted).await?;
        let approved = approve_kyc(&db, &ctx, record.id, reviewer.id).await?;
        assert_eq!(approved.status, KycStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(reviewer.id));
        assert!(approved.verified_at.is_some());

        assert!(approve_kyc(&db, &ctx, record.id, reviewer.id).await.is_err());
        assert_eq!(documents_for_record(&db, record.id).await?[0].status, DocumentStatus::Accepted);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejection_needs_reason_and_allows_new_record() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "investor@example.com").await?;
        let reviewer = create_test_admin(&db, "compliance@example.com").await?;
        let ctx = RequestContext::for_user(reviewer.id);

        let record = open_kyc_record(&db, user.id, None).await?;
        assert!(matches!(
            open_kyc_record(&db, user.id, None).await,
            Err(Error::Validation { field: "user_id", .. })
        ));
        upload_kyc_document(&db, record.id, KycDocumentType::Aadhaar, "kyc/aadhaar.pdf", user.id).await?;
        submit_for_review(&db, record.id).await?;

        let blank = reject_kyc(&db, &ctx, record.id, reviewer.id, "  ").await;
        assert!(matches!(blank, Err(Error::Validation { field: "rejection_reason", .. })));

        let rejected = reject_kyc(&db, &ctx, record.id, reviewer.id, "Blurry scan").await?;
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Blurry scan"));

        let retry = open_kyc_record(&db, user.id, None).await?;
        assert_eq!(latest_kyc_for_user(&db, user.id).await?.unwrap().id, retry.id);
        Ok(())
    }
}
