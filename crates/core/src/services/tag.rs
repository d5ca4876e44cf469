//! Tagging service.
//!
//! Comma-separated tag input with replace semantics, plus tag listings
//! and usage statistics.

use photoboard_common::{AppResult, IdGenerator};
use photoboard_db::{entities::tag, repositories::TagRepository};
use serde::Serialize;

/// Tags accepted per photo; extra tokens are dropped.
const MAX_TAGS_PER_PHOTO: usize = 20;

/// Aggregate tag usage statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagStats {
    /// Distinct tags.
    pub total_tags: u64,
    /// Highest usage count.
    pub max_usage: u64,
    /// Mean usage count, 0.0 with no tags.
    pub avg_usage: f64,
}

/// Split raw comma-separated input into clean tag tokens.
///
/// Trims whitespace, drops empties and de-duplicates case-insensitively
/// (first spelling wins).
#[must_use]
pub fn parse_tag_input(raw: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut tokens = Vec::new();

    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let lower = token.to_lowercase();
        if seen.contains(&lower) {
            continue;
        }
        seen.push(lower);
        tokens.push(token.to_string());
        if tokens.len() == MAX_TAGS_PER_PHOTO {
            break;
        }
    }

    tokens
}

/// Tag service for tag resolution and photo associations.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
    id_gen: IdGenerator,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository) -> Self {
        Self {
            tag_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Replace a photo's tag set from raw comma-separated input.
    ///
    /// Each surviving token resolves to an existing tag or creates one
    /// (get-or-create, idempotent under races); associations not in the
    /// new set are detached.
    pub async fn set_tags(&self, photo_id: &str, raw: &str) -> AppResult<Vec<tag::Model>> {
        let tokens = parse_tag_input(raw);

        let mut tags = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let tag = self
                .tag_repo
                .get_or_create(self.id_gen.generate(), token)
                .await?;
            tags.push(tag);
        }

        let tag_ids: Vec<String> = tags.iter().map(|t| t.id.clone()).collect();
        self.tag_repo
            .set_photo_tags(photo_id, &tag_ids, &self.id_gen)
            .await?;

        Ok(tags)
    }

    /// Tags attached to a photo.
    pub async fn tags_of_photo(&self, photo_id: &str) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.find_by_photo(photo_id).await
    }

    /// All tags with usage counts, most used first.
    pub async fn list_with_counts(&self) -> AppResult<Vec<(tag::Model, u64)>> {
        self.tag_repo.list_with_counts().await
    }

    /// Usage statistics over all tags.
    pub async fn stats(&self) -> AppResult<TagStats> {
        let counted = self.tag_repo.list_with_counts().await?;

        let total_tags = counted.len() as u64;
        let max_usage = counted.iter().map(|(_, n)| *n).max().unwrap_or(0);
        let avg_usage = if counted.is_empty() {
            0.0
        } else {
            let sum: u64 = counted.iter().map(|(_, n)| *n).sum();
            sum as f64 / counted.len() as f64
        };

        Ok(TagStats {
            total_tags,
            max_usage,
            avg_usage,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_input_splits_and_trims() {
        let tokens = parse_tag_input("nature, mountains , sunset");
        assert_eq!(tokens, vec!["nature", "mountains", "sunset"]);
    }

    #[test]
    fn test_parse_tag_input_drops_empties() {
        let tokens = parse_tag_input("nature,, , ,sunset,");
        assert_eq!(tokens, vec!["nature", "sunset"]);
    }

    #[test]
    fn test_parse_tag_input_dedupes_case_insensitively() {
        let tokens = parse_tag_input("Nature, nature, NATURE, sunset");
        assert_eq!(tokens, vec!["Nature", "sunset"]);
    }

    #[test]
    fn test_parse_tag_input_empty() {
        assert!(parse_tag_input("").is_empty());
        assert!(parse_tag_input("  ,  ,").is_empty());
    }

    #[test]
    fn test_parse_tag_input_caps_token_count() {
        let raw = (0..40).map(|i| format!("tag{i}")).collect::<Vec<_>>().join(",");
        assert_eq!(parse_tag_input(&raw).len(), MAX_TAGS_PER_PHOTO);
    }
}
