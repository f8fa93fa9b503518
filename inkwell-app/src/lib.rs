//! Inkwell application layer
//!
//! Posts, their collaborators and the policy that decides who may do what:
//!
//! - **auth**: identities, the `Ability` policy and row-level `ScopeFilter`s
//! - **posts**: domain types, ownership predicates, storage backends and the
//!   `PostManager` that ties them together
//!
//! The policy is pure. Loading identities and posts, and turning a denial
//! into a response, belongs to the presentation layer (inkwell-web).

pub mod auth;
pub mod posts;

pub use auth::{Ability, Action, CurrentUser, Identity, ResourceKind, ScopeFilter, Target};
pub use posts::{
    Collaboration, MemoryPostStorage, NewPost, Post, PostChanges, PostError, PostId, PostListing,
    PostManager, PostResult, PostStorage, User, UserDirectory, UserId,
};
#[cfg(feature = "sqlite")]
pub use posts::SqlitePostStorage;

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::{
        Ability, Action, CurrentUser, Identity, NewPost, Post, PostChanges, PostError, PostId,
        PostListing, PostManager, PostResult, ResourceKind, ScopeFilter, Target, User, UserId,
    };
}
