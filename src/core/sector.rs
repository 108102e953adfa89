//! Sectors - reference data for classifying companies and deals.

use crate::{
    core::{guards, slug},
    entities::{Company, Deal, Sector, company, deal, sector},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

const ENTITY: &str = "sector";

/// Creates an active sector with a unique slug.
pub async fn create_sector(
    db: &DatabaseConnection,
    name: &str,
    description: Option<String>,
) -> Result<sector::Model> {
    guards::ensure_not_blank("name", name)?;
    let slug = slug::unique_slug::<Sector, _>(db, sector::Column::Slug, &slug::slugify(name)).await?;

    let now = Utc::now();
    let sector = sector::ActiveModel {
        name: Set(name.trim().to_string()),
        slug: Set(slug),
        description: Set(description),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(sector_id = sector.id, slug = %sector.slug, "Sector created");
    Ok(sector)
}

/// Loads a sector by id.
pub async fn find_sector(db: &DatabaseConnection, id: i64) -> Result<sector::Model> {
    Sector::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))
}

/// Looks up a sector by slug.
pub async fn find_sector_by_slug(db: &DatabaseConnection, slug: &str) -> Result<Option<sector::Model>> {
    Sector::find()
        .filter(sector::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Renames a sector and re-derives its slug.
pub async fn rename_sector(db: &DatabaseConnection, id: i64, name: &str) -> Result<sector::Model> {
    guards::ensure_not_blank("name", name)?;
    let sector = find_sector(db, id).await?;

    let base = slug::slugify(name);
    let new_slug = if base == sector.slug {
        base
    } else {
        slug::unique_slug::<Sector, _>(db, sector::Column::Slug, &base).await?
    };

    let mut active: sector::ActiveModel = sector.into();
    active.name = Set(name.trim().to_string());
    active.slug = Set(new_slug);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Shows or hides a sector in [`active_sectors`].
pub async fn set_sector_active(db: &DatabaseConnection, id: i64, is_active: bool) -> Result<sector::Model> {
    let sector = find_sector(db, id).await?;
    let mut active: sector::ActiveModel = sector.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Active sectors ordered by name.
pub async fn active_sectors(db: &DatabaseConnection) -> Result<Vec<sector::Model>> {
    Sector::find()
        .filter(sector::Column::IsActive.eq(true))
        .order_by_asc(sector::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Hard-deletes a sector that nothing references.
///
/// Soft-deleted companies and deals still count as references.
pub async fn delete_sector(db: &DatabaseConnection, id: i64) -> Result<()> {
    let txn = db.begin().await?;
    Sector::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found(ENTITY, id))?;

    let companies = Company::find()
        .filter(company::Column::SectorId.eq(id))
        .count(&txn)
        .await?;
    let deals = Deal::find()
        .filter(deal::Column::SectorId.eq(id))
        .count(&txn)
        .await?;

    if companies > 0 || deals > 0 {
        warn!(sector_id = id, companies, deals, "Rejected delete of referenced sector");
        return Err(Error::IntegrityGuard {
            entity: ENTITY,
            id,
            dependents: format!("{companies} companies, {deals} deals"),
        });
    }

    Sector::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    info!(sector_id = id, "Sector deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_and_rename() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_sector(&db, "Clean Energy", None).await?;
        let second = create_sector(&db, "Clean  Energy", None).await?;
        assert_eq!(first.slug, "clean-energy");
        assert_eq!(second.slug, "clean-energy-2");

        let renamed = rename_sector(&db, first.id, "Renewables").await?;
        assert_eq!(renamed.slug, "renewables");

        // Same slug after normalisation keeps the slug without a suffix
        let renamed = rename_sector(&db, first.id, "RENEWABLES").await?;
        assert_eq!(renamed.slug, "renewables");
        assert_eq!(renamed.name, "RENEWABLES");

        assert_eq!(find_sector_by_slug(&db, "renewables").await?.unwrap().id, first.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_active_sectors() -> Result<()> {
        let db = setup_test_db().await?;
        let fintech = create_sector(&db, "Fintech", None).await?;
        create_sector(&db, "Agritech", None).await?;
        set_sector_active(&db, fintech.id, false).await?;

        let names: Vec<String> = active_sectors(&db).await?.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Agritech".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unreferenced_sector() -> Result<()> {
        let db = setup_test_db().await?;
        let sector = create_test_sector(&db, "Healthcare").await?;

        delete_sector(&db, sector.id).await?;
        assert!(Sector::find_by_id(sector.id).one(&db).await?.is_none());

        let missing = delete_sector(&db, sector.id).await;
        assert!(matches!(missing, Err(Error::NotFound { entity: "sector", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_referenced_sector_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let sector = create_test_sector(&db, "Healthcare").await?;
        let owner = create_test_user(&db, "founder@example.com").await?;
        let company = create_test_company(&db, owner.id, "MediCo").await?;

        let mut active: company::ActiveModel = company.into();
        active.sector_id = Set(Some(sector.id));
        active.update(&db).await?;

        let result = delete_sector(&db, sector.id).await;
        assert!(matches!(
            result,
            Err(Error::IntegrityGuard { entity: "sector", ref dependents, .. }) if dependents == "1 companies, 0 deals"
        ));
        assert!(Sector::find_by_id(sector.id).one(&db).await?.is_some());
        Ok(())
    }
}
