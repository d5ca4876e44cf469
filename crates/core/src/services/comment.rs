//! Comment service.

use chrono::Utc;
use photoboard_common::{AppError, AppResult, IdGenerator};
use photoboard_db::{
    entities::{comment, user},
    repositories::{CommentRepository, PhotoRepository},
};
use sea_orm::Set;

use crate::services::authorization::{AuthorizationService, permissions};

/// Shortest accepted comment after trimming.
const MIN_COMMENT_LENGTH: usize = 3;

/// Longest accepted comment.
const MAX_COMMENT_LENGTH: usize = 2000;

/// Comment text check shared by create and edit.
///
/// Returns the trimmed text, or the violated rule as a validation error.
/// The denylist match reports the rule, not the matched word.
fn validate_text(raw: &str, denylist: &[String]) -> AppResult<String> {
    let text = raw.trim();

    if text.len() < MIN_COMMENT_LENGTH {
        return Err(AppError::Validation(format!(
            "Comment must be at least {MIN_COMMENT_LENGTH} characters"
        )));
    }
    if text.len() > MAX_COMMENT_LENGTH {
        return Err(AppError::Validation(format!(
            "Comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }

    let lower = text.to_lowercase();
    if denylist.iter().any(|word| lower.contains(&word.to_lowercase())) {
        return Err(AppError::Validation(
            "Comment contains disallowed words".to_string(),
        ));
    }

    Ok(text.to_string())
}

/// Comment service for engagement on photos.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    photo_repo: PhotoRepository,
    authz: AuthorizationService,
    denylist: Vec<String>,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        photo_repo: PhotoRepository,
        authz: AuthorizationService,
        denylist: Vec<String>,
    ) -> Self {
        Self {
            comment_repo,
            photo_repo,
            authz,
            denylist,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a comment to a photo, optionally replying to a top-level
    /// comment on the same photo.
    pub async fn create(
        &self,
        author: &user::Model,
        photo_slug: &str,
        text: &str,
        parent_id: Option<&str>,
    ) -> AppResult<comment::Model> {
        let text = validate_text(text, &self.denylist)?;
        let photo = self.photo_repo.get_by_slug(photo_slug).await?;

        if let Some(parent_id) = parent_id {
            let parent = self.comment_repo.get_by_id(parent_id).await?;
            if parent.photo_id != photo.id {
                return Err(AppError::Validation(
                    "Parent comment belongs to another photo".to_string(),
                ));
            }
            // Threads stay one level deep
            if parent.parent_id.is_some() {
                return Err(AppError::Validation(
                    "Cannot reply to a reply".to_string(),
                ));
            }
        }

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            photo_id: Set(photo.id),
            user_id: Set(author.id.clone()),
            text: Set(text),
            parent_id: Set(parent_id.map(ToString::to_string)),
            created_at: Set(Utc::now().into()),
        };

        self.comment_repo.create(model).await
    }

    /// Comments on a photo, newest first.
    pub async fn list(&self, photo_slug: &str) -> AppResult<Vec<comment::Model>> {
        let photo = self.photo_repo.get_by_slug(photo_slug).await?;
        self.comment_repo.find_by_photo(&photo.id).await
    }

    /// Edit a comment. Author, staff, or `can_moderate_comments`.
    pub async fn edit(
        &self,
        requester: &user::Model,
        comment_id: &str,
        text: &str,
    ) -> AppResult<comment::Model> {
        let text = validate_text(text, &self.denylist)?;
        let comment = self.comment_repo.get_by_id(comment_id).await?;
        self.require_author_or_moderator(requester, &comment).await?;

        let mut model: comment::ActiveModel = comment.into();
        model.text = Set(text);
        self.comment_repo.update(model).await
    }

    /// Delete a comment (replies cascade). Author, staff, or
    /// `can_moderate_comments`.
    pub async fn delete(&self, requester: &user::Model, comment_id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;
        self.require_author_or_moderator(requester, &comment).await?;
        self.comment_repo.delete(&comment.id).await
    }

    async fn require_author_or_moderator(
        &self,
        requester: &user::Model,
        comment: &comment::Model,
    ) -> AppResult<()> {
        if AuthorizationService::require_owner_or_staff(requester, Some(&comment.user_id)).is_ok()
        {
            return Ok(());
        }
        self.authz
            .require_permission(requester, permissions::CAN_MODERATE_COMMENTS)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_minimum_length() {
        let result = validate_text("  hi  ", &[]);
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert_eq!(validate_text("  nice shot  ", &[]).unwrap(), "nice shot");
    }

    #[test]
    fn test_text_maximum_length() {
        let long = "x".repeat(MAX_COMMENT_LENGTH + 1);
        assert!(validate_text(&long, &[]).is_err());
    }

    #[test]
    fn test_denylist_is_case_insensitive() {
        let denylist = vec!["spam".to_string()];

        let result = validate_text("This is SPAM content", &denylist);
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert!(validate_text("This is fine content", &denylist).is_ok());
    }

    #[test]
    fn test_error_names_rule_not_word() {
        let denylist = vec!["spam".to_string()];
        let Err(AppError::Validation(message)) = validate_text("pure spam", &denylist) else {
            panic!("expected a validation error");
        };
        assert!(!message.contains("spam"));
    }
}
