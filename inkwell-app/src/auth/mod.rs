//! Authorization
//!
//! Pure policy: who may do what to which post. Nothing here performs I/O;
//! the web boundary resolves the identity and loads the post, then asks.

pub mod ability;
pub mod action;
pub mod identity;
pub mod scope;

pub use ability::Ability;
pub use action::{Action, ResourceKind, Target};
pub use identity::{CurrentUser, Identity};
pub use scope::ScopeFilter;
