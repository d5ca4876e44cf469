//! Slug derivation for photos, tags and other titled entities.
//!
//! A slug is the URL-safe identifier derived from a human-readable title.
//! Uniqueness is owned by the database (unique index plus suffix retry at
//! the write site); this module only derives candidate strings.

/// Maximum slug length. Longer bases are truncated before suffixing.
pub const MAX_SLUG_LEN: usize = 200;

/// Normalize a title into a URL-safe slug token.
///
/// Lowercases, keeps ASCII alphanumerics, and collapses every other run of
/// characters into a single `-`. Returns an empty string when the title has
/// no ASCII alphanumerics at all (e.g. a Cyrillic-only title) — callers
/// must then fall back to [`fallback_slug`].
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Identifier-based slug for titles that normalize to nothing.
///
/// Keyed by the entity's pre-generated ID so two simultaneous non-Latin
/// uploads still derive distinct bases.
#[must_use]
pub fn fallback_slug(prefix: &str, id: &str) -> String {
    let stub: String = id.chars().take(8).collect();
    format!("{prefix}-{stub}")
}

/// Candidate slug for the nth collision retry: `base`, `base-1`, `base-2`, …
#[must_use]
pub fn with_suffix(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        return base.to_string();
    }
    let suffix = format!("-{attempt}");
    let mut slug = base.to_string();
    slug.truncate(MAX_SLUG_LEN - suffix.len());
    slug.push_str(&suffix);
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Sunset"), "sunset");
        assert_eq!(slugify("Sunset over the Bay"), "sunset-over-the-bay");
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
    }

    #[test]
    fn test_slugify_mixed_script_keeps_ascii() {
        assert_eq!(slugify("Закат sunset Закат"), "sunset");
    }

    #[test]
    fn test_slugify_non_latin_is_empty() {
        assert_eq!(slugify("Закат"), "");
        assert_eq!(slugify("日の出"), "");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_fallback_slug_uses_id_stub() {
        let slug = fallback_slug("photo", "01hxyzabcdef0123456789abcd");
        assert_eq!(slug, "photo-01hxyzab");
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("sunset", 0), "sunset");
        assert_eq!(with_suffix("sunset", 1), "sunset-1");
        assert_eq!(with_suffix("sunset", 2), "sunset-2");
    }

    #[test]
    fn test_suffix_respects_max_len() {
        let base = "a".repeat(MAX_SLUG_LEN);
        let slug = with_suffix(&base, 12);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(slug.ends_with("-12"));
    }
}
