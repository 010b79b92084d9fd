//! HTTP middleware: CORS and bearer authentication.

pub mod auth;
pub mod cors;

pub use auth::{bearer_token, CallerSession, SignedIn};
pub use cors::create_cors_layer;
