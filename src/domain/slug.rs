//! Group slug derivation and validation.
//!
//! Group slugs address groups in URLs (`/group/{slug}/`). Operators may supply
//! one explicitly, in which case it must consist of ASCII letters, digits,
//! underscores or hyphens; otherwise one is derived from the group title with
//! the `slug` crate, which transliterates non-Latin scripts (so a title such as
//! "Тестовая группа" becomes `testovaia-gruppa`).

use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 50;

/// Errors that can occur while deriving or validating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may only contain letters, numbers, underscores or hyphens")]
    InvalidCharacters { slug: String },
    #[error("slug exceeds {MAX_SLUG_LEN} characters")]
    TooLong,
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.len() > MAX_SLUG_LEN {
        candidate.truncate(MAX_SLUG_LEN);
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    Ok(candidate)
}

/// Validate an operator-supplied slug without rewriting it.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong);
    }
    if !slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(SlugError::InvalidCharacters {
            slug: slug.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_transliterates_cyrillic() {
        let slug = derive_slug("Тестовая группа").expect("slug");
        assert_eq!(slug, "testovaia-gruppa");
    }

    #[test]
    fn derive_slug_rejects_blank_titles() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn derive_slug_truncates_long_titles() {
        let slug = derive_slug(&"word ".repeat(40)).expect("slug");
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn validate_slug_accepts_mixed_case_and_underscores() {
        assert!(validate_slug("Paginator_group").is_ok());
        assert!(validate_slug("test-slug").is_ok());
    }

    #[test]
    fn validate_slug_rejects_spaces_and_slashes() {
        assert!(matches!(
            validate_slug("bad slug"),
            Err(SlugError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_slug("a/b"),
            Err(SlugError::InvalidCharacters { .. })
        ));
    }
}
