//! API endpoints.

mod admin;
mod auth;
mod comments;
mod photos;
mod profiles;
mod reactions;
mod tags;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/photos", photos::router())
        .nest("/tags", tags::router())
        .merge(comments::router())
        .merge(reactions::router())
        .merge(profiles::router())
        .nest("/admin", admin::router())
}
