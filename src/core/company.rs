//! Companies, their documents, and point-in-time snapshots.
//!
//! A company's slug follows its name until an administrator overrides it; after
//! that the slug is locked and renames leave it alone. Snapshots are write-once
//! copies of the company profile kept for disputes and regulatory evidence.

use crate::{
    core::{
        audit::{self, RequestContext},
        guards,
        morph::{MorphRef, MorphType},
        slug,
    },
    entities::{
        Company, CompanyDocument, CompanySnapshot, company, company_document, company_snapshot,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::json;
use tracing::{debug, info};

const ENTITY: &str = "company";
const DOCUMENT: &str = "company_document";
const SNAPSHOT: &str = "company_snapshot";

/// Input for [`create_company`]
#[derive(Debug, Clone, Default)]
pub struct NewCompany {
    /// Founder who owns the profile
    pub owner_id: i64,
    /// Sector the company is listed under
    pub sector_id: Option<i64>,
    /// Registered company name
    pub name: String,
    /// Explicit slug; when given it is locked against later renames
    pub slug: Option<String>,
    /// Public description
    pub description: Option<String>,
    /// Company website
    pub website: Option<String>,
    /// Year of incorporation
    pub founded_year: Option<i32>,
}

/// Creates an unverified company with a unique slug.
pub async fn create_company(db: &DatabaseConnection, input: NewCompany) -> Result<company::Model> {
    guards::ensure_not_blank("name", &input.name)?;

    let (base, slug_locked) = match input.slug.as_deref() {
        Some(explicit) => (slug::slugify(explicit), true),
        None => (slug::slugify(&input.name), false),
    };
    let slug = slug::unique_slug::<Company, _>(db, company::Column::Slug, &base).await?;

    let now = Utc::now();
    let company = company::ActiveModel {
        owner_id: Set(input.owner_id),
        sector_id: Set(input.sector_id),
        name: Set(input.name.trim().to_string()),
        slug: Set(slug),
        slug_locked: Set(slug_locked),
        description: Set(input.description),
        website: Set(input.website),
        founded_year: Set(input.founded_year),
        is_verified: Set(false),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(company_id = company.id, slug = %company.slug, "Company created");
    Ok(company)
}

/// Loads a company by id.
pub async fn find_company(db: &DatabaseConnection, id: i64) -> Result<company::Model> {
    Company::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))
}

/// Looks up a company that has not been soft-deleted.
pub async fn find_company_by_slug(db: &DatabaseConnection, slug: &str) -> Result<Option<company::Model>> {
    Company::find()
        .filter(company::Column::Slug.eq(slug))
        .filter(company::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Renames a company. The slug is re-derived unless it is locked.
pub async fn rename_company(db: &DatabaseConnection, id: i64, name: &str) -> Result<company::Model> {
    guards::ensure_not_blank("name", name)?;
    let company = find_company(db, id).await?;

    let new_slug = if company.slug_locked {
        None
    } else {
        let base = slug::slugify(name);
        if base == company.slug {
            None
        } else {
            Some(slug::unique_slug::<Company, _>(db, company::Column::Slug, &base).await?)
        }
    };

    let mut active: company::ActiveModel = company.into();
    active.name = Set(name.trim().to_string());
    if let Some(slug) = new_slug {
        active.slug = Set(slug);
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Pins the slug manually and locks it.
pub async fn override_company_slug(db: &DatabaseConnection, id: i64, slug_text: &str) -> Result<company::Model> {
    let company = find_company(db, id).await?;
    let base = slug::slugify(slug_text);
    let new_slug = if base == company.slug {
        base
    } else {
        slug::unique_slug::<Company, _>(db, company::Column::Slug, &base).await?
    };

    let mut active: company::ActiveModel = company.into();
    active.slug = Set(new_slug);
    active.slug_locked = Set(true);
    active.updated_at = Set(Utc::now());
    let company = active.update(db).await?;
    info!(company_id = id, slug = %company.slug, "Company slug overridden");
    Ok(company)
}

/// Hides a company while keeping its rows for history.
pub async fn soft_delete_company(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    id: i64,
) -> Result<company::Model> {
    let txn = db.begin().await?;
    let company = Company::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))?;
    if company.is_deleted {
        return Ok(company);
    }

    let mut active: company::ActiveModel = company.into();
    active.is_deleted = Set(true);
    active.updated_at = Set(Utc::now());
    let company = active.update(&txn).await?;

    audit::record_activity(
        &txn,
        ctx,
        "company.deleted",
        Some(MorphRef::new(MorphType::Company, id)),
        json!({ "slug": company.slug }),
    )
    .await?;
    txn.commit().await?;
    Ok(company)
}

/// Attaches a document to a company. Private documents stay out of [`public_documents`].
pub async fn add_company_document(
    db: &DatabaseConnection,
    company_id: i64,
    uploaded_by: i64,
    title: &str,
    file_path: &str,
    is_public: bool,
) -> Result<company_document::Model> {
    guards::ensure_not_blank("title", title)?;
    guards::ensure_not_blank("file_path", file_path)?;
    find_company(db, company_id).await?;

    let now = Utc::now();
    let document = company_document::ActiveModel {
        company_id: Set(company_id),
        uploaded_by: Set(uploaded_by),
        title: Set(title.trim().to_string()),
        file_path: Set(file_path.to_string()),
        is_public: Set(is_public),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    debug!(company_id, document_id = document.id, "Company document added");
    Ok(document)
}

/// Deletes the document row. The stored file is the file store's concern.
pub async fn remove_company_document(db: &DatabaseConnection, document_id: i64) -> Result<()> {
    let result = CompanyDocument::delete_by_id(document_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found(DOCUMENT, document_id));
    }
    Ok(())
}

/// Documents marked public, ordered by title.
pub async fn public_documents(db: &DatabaseConnection, company_id: i64) -> Result<Vec<company_document::Model>> {
    CompanyDocument::find()
        .filter(company_document::Column::CompanyId.eq(company_id))
        .filter(company_document::Column::IsPublic.eq(true))
        .order_by_asc(company_document::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stores a copy of the company profile and its document list.
pub async fn capture_snapshot(
    db: &DatabaseConnection,
    company_id: i64,
    captured_by: Option<i64>,
    reason: &str,
) -> Result<company_snapshot::Model> {
    guards::ensure_not_blank("reason", reason)?;
    let company = find_company(db, company_id).await?;
    let documents = CompanyDocument::find()
        .filter(company_document::Column::CompanyId.eq(company_id))
        .order_by_asc(company_document::Column::Id)
        .all(db)
        .await?;

    let titles: Vec<&str> = documents.iter().map(|d| d.title.as_str()).collect();
    let data = json!({
        "company": {
            "name": company.name,
            "slug": company.slug,
            "sector_id": company.sector_id,
            "description": company.description,
            "website": company.website,
            "founded_year": company.founded_year,
            "is_verified": company.is_verified,
        },
        "documents": titles,
        "document_count": documents.len(),
    });

    let snapshot = company_snapshot::ActiveModel {
        company_id: Set(company_id),
        captured_by: Set(captured_by),
        reason: Set(reason.trim().to_string()),
        data: Set(data),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(company_id, snapshot_id = snapshot.id, "Company snapshot captured");
    Ok(snapshot)
}

/// Snapshots of a company, newest first.
pub async fn snapshots_for_company(db: &DatabaseConnection, company_id: i64) -> Result<Vec<company_snapshot::Model>> {
    CompanySnapshot::find()
        .filter(company_snapshot::Column::CompanyId.eq(company_id))
        .order_by_desc(company_snapshot::Column::CreatedAt)
        .order_by_desc(company_snapshot::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Guarded update path. Snapshots accept no changes.
pub async fn update_snapshot<C>(db: &C, active: company_snapshot::ActiveModel) -> Result<company_snapshot::Model>
where
    C: ConnectionTrait,
{
    let id = guards::primary_key(&active.id, SNAPSHOT)?;
    let current = CompanySnapshot::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(SNAPSHOT, id))?;
    guards::ensure_only_columns(SNAPSHOT, id, &guards::changed_columns(&active), &[])?;
    Ok(current)
}

/// Guarded delete path. Always fails for an existing snapshot.
pub async fn delete_snapshot<C>(db: &C, id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    CompanySnapshot::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(SNAPSHOT, id))?;
    Err(guards::delete_rejected(SNAPSHOT, id))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn new_company(owner_id: i64, name: &str) -> NewCompany {
        NewCompany {
            owner_id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_slug_follows_name_until_overridden() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "founder@example.com").await?;
        let company = create_company(&db, new_company(owner.id, "Acme Robotics")).await?;
        assert_eq!(company.slug, "acme-robotics");
        assert!(!company.slug_locked);

        let company = rename_company(&db, company.id, "Acme Drones").await?;
        assert_eq!(company.slug, "acme-drones");

        let company = override_company_slug(&db, company.id, "acme").await?;
        assert_eq!(company.slug, "acme");
        assert!(company.slug_locked);

        let company = rename_company(&db, company.id, "Acme Aerospace").await?;
        assert_eq!(company.name, "Acme Aerospace");
        assert_eq!(company.slug, "acme");
        Ok(())
    }

    #[tokio::test]
    async fn test_explicit_slug_is_locked_and_unique() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "founder@example.com").await?;
        let first = create_company(&db, new_company(owner.id, "Zeta")).await?;
        let second = create_company(
            &db,
            NewCompany {
                slug: Some("Zeta".to_string()),
                ..new_company(owner.id, "Zeta Labs")
            },
        )
        .await?;
        assert_eq!(first.slug, "zeta");
        assert_eq!(second.slug, "zeta-2");
        assert!(second.slug_locked);

        let blank = create_company(&db, new_company(owner.id, "   ")).await;
        assert!(matches!(blank, Err(Error::Validation { field: "name", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_soft_delete_hides_company() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "founder@example.com").await?;
        let company = create_test_company(&db, owner.id, "Hidden Co").await?;

        let deleted = soft_delete_company(&db, &RequestContext::for_user(owner.id), company.id).await?;
        assert!(deleted.is_deleted);
        assert!(find_company_by_slug(&db, &company.slug).await?.is_none());
        assert!(Company::find_by_id(company.id).one(&db).await?.is_some());

        let trail = audit::activities_for_subject(&db, MorphRef::new(MorphType::Company, company.id)).await?;
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, "company.deleted");
        Ok(())
    }

    #[tokio::test]
    async fn test_documents() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "founder@example.com").await?;
        let company = create_test_company(&db, owner.id, "DocCo").await?;

        add_company_document(&db, company.id, owner.id, "Pitch deck", "docs/deck.pdf", true).await?;
        let private = add_company_document(&db, company.id, owner.id, "Cap table", "docs/cap.xlsx", false).await?;

        let public: Vec<String> = public_documents(&db, company.id).await?.into_iter().map(|d| d.title).collect();
        assert_eq!(public, vec!["Pitch deck".to_string()]);

        remove_company_document(&db, private.id).await?;
        assert!(matches!(
            remove_company_document(&db, private.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshots_are_immutable() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "founder@example.com").await?;
        let company = create_test_company(&db, owner.id, "SnapCo").await?;
        add_company_document(&db, company.id, owner.id, "Pitch deck", "docs/deck.pdf", true).await?;

        let snapshot = capture_snapshot(&db, company.id, Some(owner.id), "before verification").await?;
        assert_eq!(snapshot.data["company"]["name"], "SnapCo");
        assert_eq!(snapshot.data["document_count"], 1);

        // Later changes do not leak into the stored copy
        rename_company(&db, company.id, "SnapCo Renamed").await?;
        let stored = snapshots_for_company(&db, company.id).await?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].data["company"]["name"], "SnapCo");

        let mut active: company_snapshot::ActiveModel = snapshot.clone().into();
        active.reason = Set("edited".to_string());
        assert!(matches!(
            update_snapshot(&db, active).await,
            Err(Error::ImmutableRecord { entity: "company_snapshot", .. })
        ));
        assert!(matches!(
            delete_snapshot(&db, snapshot.id).await,
            Err(Error::ImmutableRecord { entity: "company_snapshot", .. })
        ));

        // An update that changes nothing is accepted and returns the stored row
        let untouched: company_snapshot::ActiveModel = snapshot.clone().into();
        assert_eq!(update_snapshot(&db, untouched).await?.id, snapshot.id);
        Ok(())
    }
}
