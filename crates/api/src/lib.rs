//! HTTP API layer for photoboard.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: photo, tag, comment, reaction, profile and admin routes
//! - **Extractors**: authenticated-user extraction from request extensions
//! - **Middleware**: bearer-token authentication, shared service state
//! - **Response**: the envelope every endpoint returns
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
