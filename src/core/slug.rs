//! Slug derivation for URL-safe identifiers.
//!
//! Slugs are lowercase ASCII letters and digits separated by single dashes.
//! Whitespace, `-`, `_`, `.` and `/` separate words; `@` reads as "at"; every
//! other character (punctuation, non-ASCII) is dropped without splitting the word.

use crate::errors::{Error, Result};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

/// Derives a slug from free text. Deterministic for a given input.
#[must_use]
pub fn slugify(text: &str) -> String {
    fn push_word_char(slug: &mut String, ch: char, pending_separator: &mut bool) {
        if *pending_separator && !slug.is_empty() {
            slug.push('-');
        }
        *pending_separator = false;
        slug.push(ch);
    }

    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            push_word_char(&mut slug, ch.to_ascii_lowercase(), &mut pending_separator);
        } else if ch == '@' {
            pending_separator = true;
            push_word_char(&mut slug, 'a', &mut pending_separator);
            slug.push('t');
            pending_separator = true;
        } else if ch.is_whitespace() || matches!(ch, '-' | '_' | '.' | '/') {
            pending_separator = true;
        }
    }
    slug
}

/// Returns `base` if no row of `E` uses it yet, otherwise the first free
/// `base-2`, `base-3`, ...
///
/// Pass the slug column of the entity being written. An empty `base` (text with
/// no letters or digits) is rejected.
pub async fn unique_slug<E, C>(db: &C, slug_column: E::Column, base: &str) -> Result<String>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    if base.is_empty() {
        return Err(Error::validation(
            "slug",
            "name must contain at least one letter or digit",
        ));
    }

    let mut candidate = base.to_string();
    let mut suffix = 2;
    while E::find()
        .filter(slug_column.eq(candidate.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{Sector, sector};
    use crate::test_utils::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Clean Energy"), "clean-energy");
        assert_eq!(slugify("  Fintech   & Payments  "), "fintech-payments");
        assert_eq!(slugify("Acme_Corp.v2"), "acme-corp-v2");
        assert_eq!(slugify("Founder's Club"), "founders-club");
        assert_eq!(slugify("team@acme"), "team-at-acme");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("Café Déjà"), "caf-dj");
    }

    #[test]
    fn test_slugify_is_deterministic() {
        let name = "Series A: Growth Round 2025";
        assert_eq!(slugify(name), slugify(name));
        assert_eq!(slugify(name), "series-a-growth-round-2025");
    }

    #[tokio::test]
    async fn test_unique_slug_suffixes_taken_slugs() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;

        let free = unique_slug::<Sector, _>(&db, sector::Column::Slug, "fintech").await?;
        assert_eq!(free, "fintech");

        create_test_sector(&db, "Fintech").await?;
        let next = unique_slug::<Sector, _>(&db, sector::Column::Slug, "fintech").await?;
        assert_eq!(next, "fintech-2");

        let empty = unique_slug::<Sector, _>(&db, sector::Column::Slug, "").await;
        assert!(matches!(empty, Err(Error::Validation { field: "slug", .. })));
        Ok(())
    }
}
