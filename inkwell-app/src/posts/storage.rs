//! Post storage backends
//!
//! The in-memory backend evaluates scope filters with `ScopeFilter::matches`;
//! the SQLite backend (see `sqlite.rs`) renders them into SQL. Both must
//! return the same rows for the same filter.

use super::errors::{PostError, PostResult};
use super::types::{Collaboration, Post, PostDraft, PostId, PostListing, User, UserId};
use crate::auth::ScopeFilter;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Lookup of registered users
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Register a user; emails are unique
    async fn create_user(&self, email: &str, is_admin: bool) -> PostResult<User>;

    async fn find_user(&self, id: UserId) -> PostResult<Option<User>>;

    /// Users whose email exactly matches one of `emails`, ordered by id
    async fn find_users_by_email(&self, emails: &[String]) -> PostResult<Vec<User>>;
}

/// Post persistence
#[async_trait]
pub trait PostStorage: Send + Sync {
    /// Posts selected by both `filter` and `listing`, ordered by id
    async fn find_all(&self, filter: &ScopeFilter, listing: &PostListing)
        -> PostResult<Vec<Post>>;

    /// Load a post with its collaborations
    async fn find_by_id(&self, id: PostId) -> PostResult<Option<Post>>;

    /// Insert a post and its collaborations atomically
    async fn insert_post(&self, draft: &PostDraft) -> PostResult<Post>;

    /// Persist title, content and restricted. When `collaborators` is given
    /// it replaces the stored set in the same write, otherwise the stored set
    /// is left alone. The owner is never changed.
    async fn update_post(&self, post: &Post, collaborators: Option<&[UserId]>)
        -> PostResult<Post>;

    /// Delete a post together with its collaborations
    async fn delete_post(&self, id: PostId) -> PostResult<()>;

    /// Replace the collaborator set of a post
    async fn replace_collaborators(&self, id: PostId, user_ids: &[UserId]) -> PostResult<()>;

    async fn is_collaborator(&self, id: PostId, user_id: UserId) -> PostResult<bool>;

    /// Health check for the storage backend
    async fn health_check(&self) -> PostResult<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, Post>,
    next_user_id: i64,
    next_post_id: i64,
}

impl MemoryState {
    fn collaborations_for(
        &self,
        post_id: PostId,
        user_ids: &[UserId],
    ) -> PostResult<Vec<Collaboration>> {
        let mut ids = user_ids.to_vec();
        ids.sort();
        ids.dedup();

        ids.into_iter()
            .map(|user_id| {
                if self.users.contains_key(&user_id) {
                    Ok(Collaboration { user_id, post_id })
                } else {
                    Err(PostError::UserNotFound {
                        reference: user_id.to_string(),
                    })
                }
            })
            .collect()
    }
}

/// In-memory storage for users and posts (default implementation)
#[derive(Clone, Default)]
pub struct MemoryPostStorage {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryPostStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryPostStorage {
    async fn create_user(&self, email: &str, is_admin: bool) -> PostResult<User> {
        let email = email.trim();
        if email.is_empty() {
            return Err(PostError::invalid("email", "can't be blank"));
        }

        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == email) {
            return Err(PostError::invalid("email", "has already been taken"));
        }

        state.next_user_id += 1;
        let user = User {
            id: UserId(state.next_user_id),
            email: email.to_string(),
            is_admin,
        };
        state.users.insert(user.id, user.clone());
        debug!("Created user {} in memory storage", user.id);
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> PostResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn find_users_by_email(&self, emails: &[String]) -> PostResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| emails.iter().any(|e| *e == u.email))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PostStorage for MemoryPostStorage {
    async fn find_all(
        &self,
        filter: &ScopeFilter,
        listing: &PostListing,
    ) -> PostResult<Vec<Post>> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .values()
            .filter(|post| filter.matches(post) && listing.matches(post))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: PostId) -> PostResult<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.get(&id).cloned())
    }

    async fn insert_post(&self, draft: &PostDraft) -> PostResult<Post> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&draft.owner_id) {
            return Err(PostError::UserNotFound {
                reference: draft.owner_id.to_string(),
            });
        }

        let id = PostId(state.next_post_id + 1);
        let collaborations = state.collaborations_for(id, &draft.collaborator_ids)?;
        state.next_post_id = id.0;

        let now = Utc::now();
        let post = Post {
            id,
            owner_id: draft.owner_id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            restricted: draft.restricted,
            created_at: now,
            updated_at: now,
            collaborations,
        };
        state.posts.insert(id, post.clone());
        debug!("Saved post {} to memory storage", id);
        Ok(post)
    }

    async fn update_post(
        &self,
        post: &Post,
        collaborators: Option<&[UserId]>,
    ) -> PostResult<Post> {
        let mut state = self.state.write().await;
        let collaborations = collaborators
            .map(|ids| state.collaborations_for(post.id, ids))
            .transpose()?;

        let stored = state
            .posts
            .get_mut(&post.id)
            .ok_or(PostError::NotFound { post_id: post.id })?;
        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.restricted = post.restricted;
        if let Some(collaborations) = collaborations {
            stored.collaborations = collaborations;
        }
        stored.updated_at = Utc::now();

        debug!("Updated post {} in memory storage", post.id);
        Ok(stored.clone())
    }

    async fn delete_post(&self, id: PostId) -> PostResult<()> {
        let mut state = self.state.write().await;
        if state.posts.remove(&id).is_some() {
            debug!("Deleted post {} from memory storage", id);
            Ok(())
        } else {
            Err(PostError::NotFound { post_id: id })
        }
    }

    async fn replace_collaborators(&self, id: PostId, user_ids: &[UserId]) -> PostResult<()> {
        let mut state = self.state.write().await;
        let collaborations = state.collaborations_for(id, user_ids)?;
        let post = state
            .posts
            .get_mut(&id)
            .ok_or(PostError::NotFound { post_id: id })?;
        post.collaborations = collaborations;
        Ok(())
    }

    async fn is_collaborator(&self, id: PostId, user_id: UserId) -> PostResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .get(&id)
            .map(|post| post.collaborations.iter().any(|c| c.user_id == user_id))
            .unwrap_or(false))
    }

    async fn health_check(&self) -> PostResult<()> {
        Ok(())
    }
}
