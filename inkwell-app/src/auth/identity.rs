//! Caller identity
//!
//! Every authorization question starts from an [`Identity`]. Anonymous callers
//! are a first-class case rather than a missing user.

use crate::posts::{User, UserId};
use serde::{Deserialize, Serialize};

/// The authenticated user as seen by the request boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            is_admin: user.is_admin,
        }
    }
}

/// Who is asking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "user_id", rename_all = "lowercase")]
pub enum Identity {
    Admin(UserId),
    User(UserId),
    Anonymous,
}

impl Identity {
    pub fn from_current_user(user: Option<&CurrentUser>) -> Self {
        match user {
            Some(user) if user.is_admin => Identity::Admin(user.id),
            Some(user) => Identity::User(user.id),
            None => Identity::Anonymous,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Identity::Admin(id) | Identity::User(id) => Some(*id),
            Identity::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::Admin(_))
    }
}

impl From<Option<&CurrentUser>> for Identity {
    fn from(user: Option<&CurrentUser>) -> Self {
        Self::from_current_user(user)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::Admin(id) => write!(f, "admin:{}", id),
            Identity::User(id) => write!(f, "user:{}", id),
            Identity::Anonymous => write!(f, "anonymous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag_selects_admin_role() {
        let admin = CurrentUser {
            id: UserId(1),
            is_admin: true,
        };
        let member = CurrentUser {
            id: UserId(2),
            is_admin: false,
        };

        assert_eq!(Identity::from_current_user(Some(&admin)), Identity::Admin(UserId(1)));
        assert_eq!(Identity::from_current_user(Some(&member)), Identity::User(UserId(2)));
        assert_eq!(Identity::from_current_user(None), Identity::Anonymous);
    }

    #[test]
    fn anonymous_has_no_user_id() {
        assert_eq!(Identity::Anonymous.user_id(), None);
        assert!(Identity::Anonymous.is_anonymous());
        assert_eq!(Identity::User(UserId(3)).user_id(), Some(UserId(3)));
        assert_eq!(Identity::Admin(UserId(3)).to_string(), "admin:3");
    }
}
