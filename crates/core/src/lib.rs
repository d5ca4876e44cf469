//! Core business logic for photoboard.

pub mod services;

pub use services::*;
