//! Access policy
//!
//! [`Ability`] answers two questions for one identity:
//!
//! - `can_perform`: may this identity perform an action on a kind or a post?
//! - `scope_filter`: which posts may it perform the action on?
//!
//! The two are written independently and must agree: for any post `p`,
//! `scope_filter(a, k).matches(p) == can_perform(a, Target::Post(p))`.

use super::action::{Action, ResourceKind, Target};
use super::identity::{CurrentUser, Identity};
use super::scope::ScopeFilter;
use crate::posts::{ownership, Post, UserId};
use tracing::trace;

/// Policy for a single identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ability {
    identity: Identity,
}

impl Ability {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn for_user(user: Option<&CurrentUser>) -> Self {
        Self::new(Identity::from_current_user(user))
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Decide a single action on a kind or a loaded post
    pub fn can_perform<'a>(&self, action: Action, target: impl Into<Target<'a>>) -> bool {
        let target = target.into();
        let allowed = match self.identity {
            Identity::Admin(_) => true,
            Identity::User(user_id) => user_can(user_id, action, target),
            Identity::Anonymous => anonymous_can(action, target),
        };

        trace!(
            identity = %self.identity,
            action = %action,
            kind = %target.kind(),
            allowed,
            "Authorization decision"
        );
        allowed
    }

    pub fn cannot_perform<'a>(&self, action: Action, target: impl Into<Target<'a>>) -> bool {
        !self.can_perform(action, target)
    }

    /// Rows of `kind` this identity may perform `action` on
    pub fn scope_filter(&self, action: Action, kind: ResourceKind) -> ScopeFilter {
        match (self.identity, kind) {
            (Identity::Admin(_), _) => ScopeFilter::All,
            (Identity::User(user_id), ResourceKind::Post) => user_scope(user_id, action),
            (Identity::Anonymous, ResourceKind::Post) => anonymous_scope(action),
            (_, ResourceKind::User | ResourceKind::Collaboration) => ScopeFilter::Nothing,
        }
    }
}

fn user_can(user_id: UserId, action: Action, target: Target<'_>) -> bool {
    match target {
        Target::Post(post) => user_can_on_post(user_id, action, post),
        Target::Kind(ResourceKind::Post) => {
            matches!(action, Action::New | Action::Create | Action::Index)
        }
        Target::Kind(ResourceKind::User | ResourceKind::Collaboration) => false,
    }
}

fn user_can_on_post(user_id: UserId, action: Action, post: &Post) -> bool {
    let user = Some(user_id);
    match action {
        Action::New | Action::Create => true,
        Action::Index | Action::Show => ownership::is_visible(post, user),
        Action::Edit | Action::Update => {
            ownership::is_owner(post, user) || ownership::is_collaborator(post, user)
        }
        Action::Destroy => ownership::is_owner(post, user),
    }
}

fn anonymous_can(action: Action, target: Target<'_>) -> bool {
    match target {
        Target::Post(post) => {
            matches!(action, Action::Index | Action::Show) && ownership::is_visible(post, None)
        }
        Target::Kind(ResourceKind::Post) => action == Action::Index,
        Target::Kind(ResourceKind::User | ResourceKind::Collaboration) => false,
    }
}

fn user_scope(user_id: UserId, action: Action) -> ScopeFilter {
    match action {
        Action::New | Action::Create => ScopeFilter::All,
        Action::Index | Action::Show => ScopeFilter::Any(vec![
            ScopeFilter::Unrestricted,
            ScopeFilter::OwnedBy(user_id),
            ScopeFilter::CollaboratedBy(user_id),
        ]),
        Action::Edit | Action::Update => ScopeFilter::Any(vec![
            ScopeFilter::OwnedBy(user_id),
            ScopeFilter::CollaboratedBy(user_id),
        ]),
        Action::Destroy => ScopeFilter::OwnedBy(user_id),
    }
}

fn anonymous_scope(action: Action) -> ScopeFilter {
    match action {
        Action::Index | Action::Show => ScopeFilter::Unrestricted,
        _ => ScopeFilter::Nothing,
    }
}
