//! Middleware for Foodgram.
//!
//! - `token_auth` - resolves the request viewer from an auth token and
//!   guards routes that need a signed-in user

mod token_auth;

pub use token_auth::{require_auth, resolve_viewer, AuthUser, Viewer};
