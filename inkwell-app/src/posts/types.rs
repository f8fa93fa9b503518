use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Maximum title length, mirrored by the `VARCHAR(80)` column
pub const TITLE_MAX_CHARS: usize = 80;

/// Field name -> validation messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Identifier of a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type), sqlx(transparent))]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UserId(pub i64);

/// Identifier of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type), sqlx(transparent))]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct PostId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(UserId)
    }
}

impl FromStr for PostId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PostId)
    }
}

/// A registered user as far as authorization is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlite", derive(sqlx::FromRow))]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[cfg_attr(feature = "sqlite", sqlx(rename = "admin"))]
    pub is_admin: bool,
}

/// "`user_id` may co-edit `post_id`"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlite", derive(sqlx::FromRow))]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Collaboration {
    pub user_id: UserId,
    pub post_id: PostId,
}

/// A post together with its loaded collaborations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Post {
    pub id: PostId,
    /// Set at creation, never reassigned
    pub owner_id: UserId,
    pub title: String,
    pub content: String,
    pub restricted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub collaborations: Vec<Collaboration>,
}

impl Post {
    /// Collaborating user ids, in ascending order
    pub fn collaborator_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.collaborations.iter().map(|c| c.user_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Request to create a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub restricted: bool,
    /// Emails of users invited to co-edit; unknown emails are ignored
    pub collaborator_emails: Option<Vec<String>>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        validate_fields(&self.title, &self.content)
    }
}

/// Partial update of a post; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub restricted: Option<bool>,
    /// Replaces the whole collaborator set when present
    pub collaborator_emails: Option<Vec<String>>,
}

impl PostChanges {
    /// Apply the field changes to `post` and validate the result
    pub fn apply_to(&self, post: &mut Post) -> Result<(), FieldErrors> {
        let title = self.title.as_deref().unwrap_or(&post.title);
        let content = self.content.as_deref().unwrap_or(&post.content);
        validate_fields(title, content)?;

        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(restricted) = self.restricted {
            post.restricted = restricted;
        }
        Ok(())
    }
}

/// A validated post ready to be inserted
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub owner_id: UserId,
    pub title: String,
    pub content: String,
    pub restricted: bool,
    pub collaborator_ids: Vec<UserId>,
}

/// Narrowing applied on top of the authorization scope when listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct PostListing {
    /// Only posts owned by this user
    pub created_by: Option<UserId>,
    /// Only posts that have at least one collaborator
    pub with_collaborators: bool,
}

impl PostListing {
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(owner) = self.created_by {
            if post.owner_id != owner {
                return false;
            }
        }
        !self.with_collaborators || !post.collaborations.is_empty()
    }
}

fn validate_fields(title: &str, content: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if title.trim().is_empty() {
        errors
            .entry("title".to_string())
            .or_default()
            .push("can't be blank".to_string());
    } else if title.chars().count() > TITLE_MAX_CHARS {
        errors.entry("title".to_string()).or_default().push(format!(
            "is too long (maximum is {} characters)",
            TITLE_MAX_CHARS
        ));
    }

    if content.trim().is_empty() {
        errors
            .entry("content".to_string())
            .or_default()
            .push("can't be blank".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        let now = Utc::now();
        Post {
            id: PostId(1),
            owner_id: UserId(7),
            title: "Hot Day".to_string(),
            content: "The sun seems to like me very much these days.".to_string(),
            restricted: false,
            created_at: now,
            updated_at: now,
            collaborations: Vec::new(),
        }
    }

    #[test]
    fn new_post_requires_title_and_content() {
        let errors = NewPost::default().validate().unwrap_err();
        assert_eq!(errors["title"], vec!["can't be blank".to_string()]);
        assert_eq!(errors["content"], vec!["can't be blank".to_string()]);
    }

    #[test]
    fn title_is_limited_to_80_chars() {
        let post = NewPost {
            title: "x".repeat(81),
            content: "body".to_string(),
            ..Default::default()
        };
        let errors = post.validate().unwrap_err();
        assert!(errors["title"][0].contains("maximum is 80"));
        assert!(!errors.contains_key("content"));

        let post = NewPost {
            title: "é".repeat(80),
            content: "body".to_string(),
            ..Default::default()
        };
        assert!(post.validate().is_ok());
    }

    #[test]
    fn changes_leave_post_untouched_when_invalid() {
        let mut post = sample_post();
        let changes = PostChanges {
            title: Some("   ".to_string()),
            restricted: Some(true),
            ..Default::default()
        };

        assert!(changes.apply_to(&mut post).is_err());
        assert_eq!(post.title, "Hot Day");
        assert!(!post.restricted);
    }

    #[test]
    fn changes_apply_only_present_fields() {
        let mut post = sample_post();
        let changes = PostChanges {
            restricted: Some(true),
            ..Default::default()
        };

        changes.apply_to(&mut post).unwrap();
        assert!(post.restricted);
        assert_eq!(post.title, "Hot Day");
        assert_eq!(post.owner_id, UserId(7));
    }

    #[test]
    fn listing_narrows_by_owner_and_collaborators() {
        let mut post = sample_post();
        assert!(PostListing::default().matches(&post));
        assert!(!PostListing {
            created_by: Some(UserId(8)),
            ..Default::default()
        }
        .matches(&post));

        let with_collaborators = PostListing {
            with_collaborators: true,
            ..Default::default()
        };
        assert!(!with_collaborators.matches(&post));

        post.collaborations.push(Collaboration {
            user_id: UserId(8),
            post_id: post.id,
        });
        assert!(with_collaborators.matches(&post));
    }
}
