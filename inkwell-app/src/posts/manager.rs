//! Post manager
//!
//! Orchestrates validation, collaborator resolution and persistence. It does
//! not decide access: callers ask an [`Ability`] first and only call into the
//! manager once the action is allowed. `list` is the exception, since the
//! ability's scope filter is what selects the rows.

use super::errors::{PostError, PostResult};
use super::ownership;
use super::storage::{MemoryPostStorage, PostStorage, UserDirectory};
use super::types::{NewPost, Post, PostChanges, PostDraft, PostId, PostListing, User, UserId};
use crate::auth::{Ability, Action, ResourceKind};
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point for post operations
#[derive(Clone)]
pub struct PostManager {
    storage: Arc<dyn PostStorage>,
    users: Arc<dyn UserDirectory>,
}

impl PostManager {
    /// Create a manager backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        let storage = Arc::new(MemoryPostStorage::new());
        Self::new(storage.clone(), storage)
    }

    pub fn new(storage: Arc<dyn PostStorage>, users: Arc<dyn UserDirectory>) -> Self {
        Self { storage, users }
    }

    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.users
    }

    /// Posts the ability may list, narrowed by `listing`
    pub async fn list(&self, ability: &Ability, listing: &PostListing) -> PostResult<Vec<Post>> {
        let filter = ability.scope_filter(Action::Index, ResourceKind::Post);
        if filter.is_empty() {
            return Ok(Vec::new());
        }

        let posts = self.storage.find_all(&filter, listing).await?;
        debug!(
            identity = %ability.identity(),
            filter = %filter,
            count = posts.len(),
            "Listed posts"
        );
        Ok(posts)
    }

    pub async fn find(&self, id: PostId) -> PostResult<Post> {
        self.storage
            .find_by_id(id)
            .await?
            .ok_or(PostError::NotFound { post_id: id })
    }

    /// Validate and persist a new post owned by `owner`
    pub async fn create(&self, owner: UserId, new_post: NewPost) -> PostResult<Post> {
        new_post.validate()?;

        let collaborator_ids = match &new_post.collaborator_emails {
            Some(emails) => self.resolve_emails(emails).await?,
            None => Vec::new(),
        };

        let draft = PostDraft {
            owner_id: owner,
            title: new_post.title,
            content: new_post.content,
            restricted: new_post.restricted,
            collaborator_ids,
        };
        let post = self.storage.insert_post(&draft).await?;

        info!(
            post_id = %post.id,
            owner_id = %owner,
            collaborators = post.collaborations.len(),
            "Created post"
        );
        Ok(post)
    }

    /// Apply `changes` to `post` and persist them. Collaborators are replaced
    /// only when `collaborator_emails` is present.
    pub async fn update(&self, mut post: Post, changes: PostChanges) -> PostResult<Post> {
        changes.apply_to(&mut post)?;

        let collaborators = match &changes.collaborator_emails {
            Some(emails) => {
                ownership::set_collaborators_by_email(&mut post, emails, self.users.as_ref())
                    .await?;
                Some(post.collaborator_ids())
            }
            None => None,
        };

        let post = self
            .storage
            .update_post(&post, collaborators.as_deref())
            .await?;
        info!(post_id = %post.id, "Updated post");
        Ok(post)
    }

    pub async fn destroy(&self, id: PostId) -> PostResult<()> {
        self.storage.delete_post(id).await?;
        info!(post_id = %id, "Deleted post");
        Ok(())
    }

    /// Resolve `emails` into the post's in-memory collaborator set without
    /// persisting it
    pub async fn set_collaborators_by_email(
        &self,
        post: &mut Post,
        emails: &[String],
    ) -> PostResult<()> {
        ownership::set_collaborators_by_email(post, emails, self.users.as_ref()).await
    }

    /// Resolve `emails` and make them the post's persisted collaborator set
    pub async fn replace_collaborators_by_email(
        &self,
        post_id: PostId,
        emails: &[String],
    ) -> PostResult<Post> {
        let user_ids = self.resolve_emails(emails).await?;
        self.storage.replace_collaborators(post_id, &user_ids).await?;
        debug!(post_id = %post_id, collaborators = user_ids.len(), "Replaced collaborators");
        self.find(post_id).await
    }

    pub async fn is_collaborator(&self, post_id: PostId, user_id: UserId) -> PostResult<bool> {
        self.storage.is_collaborator(post_id, user_id).await
    }

    pub async fn find_user(&self, id: UserId) -> PostResult<Option<User>> {
        self.users.find_user(id).await
    }

    pub async fn register_user(&self, email: &str, is_admin: bool) -> PostResult<User> {
        let user = self.users.create_user(email, is_admin).await?;
        info!(user_id = %user.id, is_admin, "Registered user");
        Ok(user)
    }

    pub async fn health_check(&self) -> PostResult<()> {
        self.storage.health_check().await
    }

    async fn resolve_emails(&self, emails: &[String]) -> PostResult<Vec<UserId>> {
        let emails = ownership::normalize_emails(emails);
        let users = self.users.find_users_by_email(&emails).await?;
        let mut ids: Vec<UserId> = users.into_iter().map(|u| u.id).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;

    fn new_post(title: &str, restricted: bool, emails: Option<Vec<&str>>) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: "Some words".to_string(),
            restricted,
            collaborator_emails: emails.map(|e| e.into_iter().map(str::to_string).collect()),
        }
    }

    #[tokio::test]
    async fn create_rejects_invalid_posts() {
        let manager = PostManager::in_memory();
        let alice = manager.register_user("alice@example.com", false).await.unwrap();

        let err = manager
            .create(alice.id, new_post("", false, None))
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::Validation { ref errors } if errors.contains_key("title")));
    }

    #[tokio::test]
    async fn create_resolves_collaborator_emails() {
        let manager = PostManager::in_memory();
        let alice = manager.register_user("alice@example.com", false).await.unwrap();
        let bob = manager.register_user("bob@example.com", false).await.unwrap();

        let post = manager
            .create(
                alice.id,
                new_post(
                    "Hot Day",
                    true,
                    Some(vec!["bob@example.com", " bob@example.com", "nobody@example.com"]),
                ),
            )
            .await
            .unwrap();

        assert_eq!(post.owner_id, alice.id);
        assert_eq!(post.collaborator_ids(), vec![bob.id]);
        assert!(manager.is_collaborator(post.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn update_without_emails_keeps_collaborators() {
        let manager = PostManager::in_memory();
        let alice = manager.register_user("alice@example.com", false).await.unwrap();
        let bob = manager.register_user("bob@example.com", false).await.unwrap();
        let post = manager
            .create(alice.id, new_post("Hot Day", false, Some(vec!["bob@example.com"])))
            .await
            .unwrap();

        let updated = manager
            .update(
                post,
                PostChanges {
                    restricted: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.restricted);
        assert_eq!(updated.collaborator_ids(), vec![bob.id]);

        let cleared = manager
            .update(
                updated,
                PostChanges {
                    collaborator_emails: Some(vec![]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.collaborations.is_empty());
    }

    #[tokio::test]
    async fn stale_update_does_not_restore_revoked_collaborator() {
        let manager = PostManager::in_memory();
        let alice = manager.register_user("alice@example.com", false).await.unwrap();
        let bob = manager.register_user("bob@example.com", false).await.unwrap();
        let stale = manager
            .create(alice.id, new_post("Hot Day", true, Some(vec!["bob@example.com"])))
            .await
            .unwrap();

        manager
            .replace_collaborators_by_email(stale.id, &[])
            .await
            .unwrap();
        let updated = manager
            .update(
                stale,
                PostChanges {
                    title: Some("Cold Day".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Cold Day");
        assert!(updated.collaborations.is_empty());
        assert!(!manager.is_collaborator(updated.id, bob.id).await.unwrap());
        let as_bob = Ability::new(Identity::User(bob.id));
        assert!(manager
            .list(&as_bob, &PostListing::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn list_uses_the_index_scope() {
        let manager = PostManager::in_memory();
        let alice = manager.register_user("alice@example.com", false).await.unwrap();
        let bob = manager.register_user("bob@example.com", false).await.unwrap();
        manager
            .create(alice.id, new_post("Open", false, None))
            .await
            .unwrap();
        manager
            .create(alice.id, new_post("Private", true, None))
            .await
            .unwrap();

        let as_alice = Ability::new(Identity::User(alice.id));
        let as_bob = Ability::new(Identity::User(bob.id));
        let anonymous = Ability::new(Identity::Anonymous);
        let listing = PostListing::default();

        assert_eq!(manager.list(&as_alice, &listing).await.unwrap().len(), 2);
        assert_eq!(manager.list(&as_bob, &listing).await.unwrap().len(), 1);
        assert_eq!(manager.list(&anonymous, &listing).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_collaborators_is_idempotent() {
        let manager = PostManager::in_memory();
        let alice = manager.register_user("alice@example.com", false).await.unwrap();
        let bob = manager.register_user("bob@example.com", false).await.unwrap();
        let post = manager
            .create(alice.id, new_post("Hot Day", false, None))
            .await
            .unwrap();

        let emails = vec!["bob@example.com".to_string()];
        let once = manager
            .replace_collaborators_by_email(post.id, &emails)
            .await
            .unwrap();
        let twice = manager
            .replace_collaborators_by_email(post.id, &emails)
            .await
            .unwrap();
        assert_eq!(once.collaborations, twice.collaborations);
        assert_eq!(twice.collaborator_ids(), vec![bob.id]);
    }

    #[tokio::test]
    async fn destroy_missing_post_is_not_found() {
        let manager = PostManager::in_memory();
        assert!(matches!(
            manager.destroy(PostId(1)).await,
            Err(PostError::NotFound { .. })
        ));
        assert!(matches!(
            manager.find(PostId(1)).await,
            Err(PostError::NotFound { .. })
        ));
    }
}
