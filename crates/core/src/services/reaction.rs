//! Reaction service.
//!
//! Like/dislike votes with toggle semantics: re-submitting the same kind
//! retracts the vote, submitting the opposite kind flips it.

use photoboard_common::{AppResult, IdGenerator};
use photoboard_db::{
    entities::{reaction, reaction::ReactionKind},
    repositories::{PhotoRepository, ReactionChange, ReactionCounts, ReactionRepository},
};

/// Reaction service for vote upserts and aggregates.
#[derive(Clone)]
pub struct ReactionService {
    reaction_repo: ReactionRepository,
    photo_repo: PhotoRepository,
    id_gen: IdGenerator,
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub const fn new(reaction_repo: ReactionRepository, photo_repo: PhotoRepository) -> Self {
        Self {
            reaction_repo,
            photo_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set a user's reaction on a photo and return the fresh aggregates.
    ///
    /// The toggle itself runs in a transaction at the repository; the
    /// unique `(user, photo)` index makes concurrent double-submission a
    /// conflict instead of a duplicate vote.
    pub async fn set(
        &self,
        user_id: &str,
        photo_slug: &str,
        kind: ReactionKind,
    ) -> AppResult<(ReactionChange, ReactionCounts)> {
        let photo = self.photo_repo.get_by_slug(photo_slug).await?;

        let change = self
            .reaction_repo
            .toggle(self.id_gen.generate(), user_id, &photo.id, kind)
            .await?;

        tracing::debug!(
            user_id = %user_id,
            photo_id = %photo.id,
            ?kind,
            ?change,
            "Reaction updated"
        );

        let counts = self.reaction_repo.counts(&photo.id).await?;
        Ok((change, counts))
    }

    /// Current aggregates for a photo.
    pub async fn counts(&self, photo_id: &str) -> AppResult<ReactionCounts> {
        self.reaction_repo.counts(photo_id).await
    }

    /// The requester's live reaction on a photo, if any.
    pub async fn find(
        &self,
        user_id: &str,
        photo_id: &str,
    ) -> AppResult<Option<reaction::Model>> {
        self.reaction_repo
            .find_by_user_and_photo(user_id, photo_id)
            .await
    }
}
