//! User account service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use photoboard_common::{AppError, AppResult, IdGenerator};
use photoboard_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::mail::MailService;
use crate::services::profile::ProfileService;

/// Password-reset tokens expire after one hour.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    /// Desired username.
    #[validate(length(min = 3, max = 30))]
    pub username: String,
    /// Email address.
    #[validate(email)]
    pub email: String,
    /// Plaintext password.
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Input for updating account fields.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    /// New email address.
    #[validate(email)]
    pub email: Option<String>,
}

/// User service for registration, login and credential management.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    profile_service: ProfileService,
    mail: MailService,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        profile_service: ProfileService,
        mail: MailService,
    ) -> Self {
        Self {
            user_repo,
            profile_service,
            mail,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account.
    ///
    /// The profile is created before this returns — every account has
    /// exactly one profile from the instant it exists.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if !input
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::Validation(
                "Username may only contain letters, digits and underscores".to_string(),
            ));
        }

        // Friendly precheck; the unique indexes are the real guard.
        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(input.email),
            password_hash: Set(password_hash),
            token: Set(Some(self.id_gen.generate_token())),
            reset_token: Set(None),
            reset_token_expires_at: Set(None),
            is_staff: Set(false),
            is_superuser: Set(false),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.user_repo.create(model).await?;
        self.profile_service.ensure_profile(&created.id).await?;

        tracing::info!(user_id = %created.id, username = %created.username, "Registered user");
        Ok(created)
    }

    /// Log in with a username or email address plus password.
    ///
    /// Returns the account and its API token.
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<(user::Model, String)> {
        let user = if identifier.contains('@') {
            self.user_repo.find_by_email(identifier).await?
        } else {
            self.user_repo.find_by_username(identifier).await?
        };

        let Some(user) = user else {
            return Err(AppError::Unauthorized);
        };

        if !user.is_active {
            return Err(AppError::Unauthorized);
        }
        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        // Issue a token on first login
        if let Some(ref token) = user.token {
            let token = token.clone();
            return Ok((user, token));
        }

        let token = self.id_gen.generate_token();
        let mut model: user::ActiveModel = user.into();
        model.token = Set(Some(token.clone()));
        model.updated_at = Set(Some(Utc::now().into()));
        let updated = self.user_repo.update(model).await?;

        Ok((updated, token))
    }

    /// Resolve an API token into an account (auth middleware).
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Get an account by ID.
    pub async fn get(&self, user_id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(user_id).await
    }

    /// Get an account by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_username(username).await
    }

    /// Update account fields. The profile is touched alongside.
    pub async fn update(&self, user_id: &str, input: UpdateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;

        if let Some(ref email) = input.email
            && email != &user.email
            && self.user_repo.find_by_email(email).await?.is_some()
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let mut model: user::ActiveModel = user.into();
        if let Some(email) = input.email {
            model.email = Set(email);
        }
        model.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(model).await?;
        self.profile_service.ensure_profile(&updated.id).await?;
        Ok(updated)
    }

    /// Change the password, verifying the current one first.
    pub async fn change_password(
        &self,
        user_id: &str,
        current: &str,
        new_password: &str,
    ) -> AppResult<()> {
        if new_password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        if !verify_password(current, &user.password_hash)? {
            return Err(AppError::Forbidden("Current password is wrong".to_string()));
        }

        let mut model: user::ActiveModel = user.into();
        model.password_hash = Set(hash_password(new_password)?);
        model.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(model).await?;
        Ok(())
    }

    /// Start a password reset for the given email.
    ///
    /// Always succeeds from the caller's view: an unknown address is not
    /// revealed, and mail delivery is fire-and-forget.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = self.id_gen.generate_token();
        let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

        let username = user.username.clone();
        let mut model: user::ActiveModel = user.into();
        model.reset_token = Set(Some(token.clone()));
        model.reset_token_expires_at = Set(Some(expires.into()));
        self.user_repo.update(model).await?;

        let body = format!(
            "Hello {username},\n\nUse this token to reset your password: {token}\n\nThe token expires in one hour."
        );
        if let Err(e) = self.mail.send(email, "Password reset", &body).await {
            tracing::warn!(error = %e, "Failed to send password reset mail");
        }

        Ok(())
    }

    /// Complete a password reset with a valid token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        if new_password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let user = self
            .user_repo
            .find_by_reset_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Reset token".to_string()))?;

        let expired = user
            .reset_token_expires_at
            .is_none_or(|at| at < Utc::now());
        if expired {
            return Err(AppError::Validation("Reset token has expired".to_string()));
        }

        let mut model: user::ActiveModel = user.into();
        model.password_hash = Set(hash_password(new_password)?);
        model.reset_token = Set(None);
        model.reset_token_expires_at = Set(None);
        model.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(model).await?;
        Ok(())
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_register_input_validation() {
        let too_short = RegisterInput {
            username: "ab".to_string(),
            email: "a@example.com".to_string(),
            password: "longenough".to_string(),
        };
        assert!(too_short.validate().is_err());

        let bad_email = RegisterInput {
            username: "alice".to_string(),
            email: "not-an-email".to_string(),
            password: "longenough".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let weak_password = RegisterInput {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(weak_password.validate().is_err());

        let ok = RegisterInput {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "longenough".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
