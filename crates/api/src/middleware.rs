//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use photoboard_core::{
    AuthorizationService, BrowseService, CommentService, PhotoService, ProfileService,
    ReactionService, RoleService, TagService, UserService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub profile_service: ProfileService,
    pub authorization_service: AuthorizationService,
    pub role_service: RoleService,
    pub photo_service: PhotoService,
    pub browse_service: BrowseService,
    pub tag_service: TagService,
    pub comment_service: CommentService,
    pub reaction_service: ReactionService,
}

/// Authentication middleware.
///
/// Resolves a bearer token into a user model stored in request extensions;
/// the `AuthUser` extractor picks it up from there.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
