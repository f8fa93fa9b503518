//! Ownership and collaboration predicates

use super::errors::PostResult;
use super::storage::UserDirectory;
use super::types::{Collaboration, Post, User, UserId};
use tracing::debug;

/// `None` stands for an anonymous caller, who owns nothing
pub fn is_owner(post: &Post, user: Option<UserId>) -> bool {
    user == Some(post.owner_id)
}

/// In-memory check over the post's loaded collaborations.
/// `PostStorage::is_collaborator` answers the same question in storage.
pub fn is_collaborator(post: &Post, user: Option<UserId>) -> bool {
    match user {
        Some(user_id) => post.collaborations.iter().any(|c| c.user_id == user_id),
        None => false,
    }
}

/// Unrestricted posts are visible to everyone; restricted ones only to
/// their owner and collaborators
pub fn is_visible(post: &Post, user: Option<UserId>) -> bool {
    !post.restricted || is_owner(post, user) || is_collaborator(post, user)
}

/// Replace the post's collaborations with one entry per distinct user
pub fn assign_collaborators<'a>(post: &mut Post, users: impl IntoIterator<Item = &'a User>) {
    let mut ids: Vec<UserId> = users.into_iter().map(|u| u.id).collect();
    ids.sort();
    ids.dedup();

    post.collaborations = ids
        .into_iter()
        .map(|user_id| Collaboration {
            user_id,
            post_id: post.id,
        })
        .collect();
}

/// Trimmed, non-empty emails in input order
pub fn normalize_emails(emails: &[String]) -> Vec<String> {
    emails
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve emails to users and make them the post's collaborators.
/// Emails without a matching user are dropped.
pub async fn set_collaborators_by_email(
    post: &mut Post,
    emails: &[String],
    users: &dyn UserDirectory,
) -> PostResult<()> {
    let emails = normalize_emails(emails);
    let found = users.find_users_by_email(&emails).await?;

    if found.len() < emails.len() {
        debug!(
            post_id = %post.id,
            requested = emails.len(),
            found = found.len(),
            "Ignoring collaborator emails without a matching user"
        );
    }

    assign_collaborators(post, &found);
    Ok(())
}
