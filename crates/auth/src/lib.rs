//! `storefront-auth`: identity lookup boundary.
//!
//! The storefront does not authenticate anyone. It only needs to turn a user
//! id into a display name when stamping audit trails and order snapshots.

pub mod directory;
pub mod identity;

pub use directory::InMemoryDirectory;
pub use identity::{IdentityProvider, UserProfile};
