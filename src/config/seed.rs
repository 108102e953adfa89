//! Reference data seeding from seed.toml
//!
//! The seed file lists sectors, feature flags and legal agreements that must
//! exist before the platform is usable. Seeding is idempotent: rows that
//! already exist (by slug, key, or kind and version) are left untouched, so it
//! runs on every start.

use crate::{
    core::{feature_flag, legal, sector, slug},
    entities::{
        LegalAgreement,
        legal_agreement::{self, AgreementKind},
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Default seed file location, overridable with `SEED_CONFIG`
pub const DEFAULT_SEED_PATH: &str = "seed.toml";

/// The whole seed file
#[derive(Debug, Default, Deserialize)]
pub struct SeedConfig {
    /// Sectors created when no sector with the same slug exists
    #[serde(default)]
    pub sectors: Vec<SectorSeed>,
    /// Feature flags created when the key is unused
    #[serde(default)]
    pub feature_flags: Vec<FeatureFlagSeed>,
    /// Legal agreements, one per kind and version
    #[serde(default)]
    pub agreements: Vec<AgreementSeed>,
}

/// One `[[sectors]]` table
#[derive(Debug, Deserialize, Clone)]
pub struct SectorSeed {
    /// Display name; the slug is derived from it
    pub name: String,
    /// Optional blurb shown on the sector page
    pub description: Option<String>,
}

/// One `[[feature_flags]]` table
#[derive(Debug, Deserialize, Clone)]
pub struct FeatureFlagSeed {
    /// Lookup key, e.g. `"new_dashboard"`
    pub key: String,
    /// Human-readable label
    pub name: String,
    /// Whether the flag starts switched on
    #[serde(default)]
    pub active: bool,
    /// Omit for a full rollout
    pub percentage: Option<i32>,
}

/// One `[[agreements]]` table
#[derive(Debug, Deserialize, Clone)]
pub struct AgreementSeed {
    /// e.g. `"terms_of_service"`
    pub kind: AgreementKind,
    /// Title shown to the signer
    pub title: String,
    /// Version label, unique per kind
    pub version: String,
    /// Full agreement text
    pub body: String,
    /// ISO date string, e.g. `"2025-04-01"`
    pub effective_on: NaiveDate,
}

/// What a seeding run inserted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    /// Sectors inserted
    pub sectors: usize,
    /// Feature flags inserted
    pub feature_flags: usize,
    /// Agreements inserted
    pub agreements: usize,
}

/// Parses a seed file from TOML text.
pub fn parse_seed_config(contents: &str) -> Result<SeedConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse seed file: {e}"),
    })
}

/// Loads the seed file at `path`. A missing file is not an error: seeding is
/// skipped and `None` is returned.
pub fn load_seed_config<P: AsRef<Path>>(path: P) -> Result<Option<SeedConfig>> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "Seed file not found, skipping reference data");
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read seed file {}: {e}", path.display()),
    })?;
    parse_seed_config(&contents).map(Some)
}

/// Seed file path from `SEED_CONFIG`, or [`DEFAULT_SEED_PATH`].
#[must_use]
pub fn seed_path() -> String {
    std::env::var("SEED_CONFIG").unwrap_or_else(|_| DEFAULT_SEED_PATH.to_string())
}

/// Inserts whatever the seed file lists that is not in the database yet.
pub async fn seed_reference_data(db: &DatabaseConnection, config: &SeedConfig) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for seed in &config.sectors {
        if sector::find_sector_by_slug(db, &slug::slugify(&seed.name)).await?.is_some() {
            continue;
        }
        sector::create_sector(db, &seed.name, seed.description.clone()).await?;
        report.sectors += 1;
    }

    for seed in &config.feature_flags {
        if feature_flag::find_flag(db, &seed.key).await?.is_some() {
            continue;
        }
        feature_flag::create_flag(db, &seed.key, &seed.name, seed.active, seed.percentage).await?;
        report.feature_flags += 1;
    }

    for seed in &config.agreements {
        let existing = LegalAgreement::find()
            .filter(legal_agreement::Column::Kind.eq(seed.kind))
            .filter(legal_agreement::Column::Version.eq(seed.version.trim()))
            .count(db)
            .await?;
        if existing > 0 {
            continue;
        }
        legal::publish_agreement(db, seed.kind, &seed.title, &seed.version, &seed.body, seed.effective_on).await?;
        report.agreements += 1;
    }

    info!(
        sectors = report.sectors,
        feature_flags = report.feature_flags,
        agreements = report.agreements,
        "Reference data seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    const SAMPLE: &str = r#"
        [[sectors]]
        name = "Clean Energy"
        description = "Solar, wind and storage"

        [[sectors]]
        name = "Fintech"

        [[feature_flags]]
        key = "new_checkout"
        name = "New checkout flow"
        active = true
        percentage = 25

        [[agreements]]
        kind = "terms_of_service"
        title = "Terms of Service"
        version = "1.0"
        body = "These terms govern your use of the platform."
        effective_on = "2025-04-01"
    "#;

    #[test]
    fn test_parse_seed_config() {
        let config = parse_seed_config(SAMPLE).unwrap();
        assert_eq!(config.sectors.len(), 2);
        assert_eq!(config.sectors[1].description, None);
        assert_eq!(config.feature_flags[0].percentage, Some(25));
        assert_eq!(config.agreements[0].kind, AgreementKind::TermsOfService);
        assert_eq!(
            config.agreements[0].effective_on,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
        );

        let empty = parse_seed_config("").unwrap();
        assert!(empty.sectors.is_empty());

        assert!(matches!(
            parse_seed_config("[[sectors]]\nname = 3"),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_missing_seed_file_is_skipped() {
        let loaded = load_seed_config("definitely/not/here/seed.toml").unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let config = parse_seed_config(SAMPLE)?;

        let first = seed_reference_data(&db, &config).await?;
        assert_eq!(
            first,
            SeedReport {
                sectors: 2,
                feature_flags: 1,
                agreements: 1
            }
        );

        let second = seed_reference_data(&db, &config).await?;
        assert_eq!(second, SeedReport::default());

        assert_eq!(sector::active_sectors(&db).await?.len(), 2);
        assert!(legal::active_agreement(&db, AgreementKind::TermsOfService).await?.is_some());
        Ok(())
    }
}
