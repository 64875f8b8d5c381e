//! Service layer for Foodgram.
//!
//! Contains logic that sits between handlers and the database:
//! - Auth (password hashing, token issue and validation)
//! - Media (recipe image decoding and storage)
//! - ShoppingList (plain-text cart aggregation)
//! - Loader (ingredient and tag imports)
//! - Statics (static file collection)

mod auth;
mod loader;
mod media;
pub mod shopping_list;
pub mod statics;

pub use auth::{hash_password, verify_password, AuthService};
pub use loader::{DataLoader, LoadReport};
pub use media::{DecodedImage, MediaStorage};
