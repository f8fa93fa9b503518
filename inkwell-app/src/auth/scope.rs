//! Row-level scope filters
//!
//! A [`ScopeFilter`] is the query-side twin of `Ability::can_perform`: it
//! selects exactly the posts an identity may perform an action on. It can be
//! evaluated in memory against a loaded [`Post`] or rendered into a SQL
//! predicate over the `posts` table with bound parameters.

use crate::posts::{Post, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicate over posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScopeFilter {
    /// Every row
    All,
    /// No row
    Nothing,
    /// Rows with `restricted = false`
    Unrestricted,
    /// Rows owned by the user
    OwnedBy(UserId),
    /// Rows the user collaborates on
    CollaboratedBy(UserId),
    /// Union of the inner filters; empty means no row
    Any(Vec<ScopeFilter>),
}

impl ScopeFilter {
    /// Evaluate against a loaded post
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            ScopeFilter::All => true,
            ScopeFilter::Nothing => false,
            ScopeFilter::Unrestricted => !post.restricted,
            ScopeFilter::OwnedBy(user_id) => post.owner_id == *user_id,
            ScopeFilter::CollaboratedBy(user_id) => {
                post.collaborations.iter().any(|c| c.user_id == *user_id)
            }
            ScopeFilter::Any(filters) => filters.iter().any(|f| f.matches(post)),
        }
    }

    /// Whether the filter can never select a row
    pub fn is_empty(&self) -> bool {
        match self {
            ScopeFilter::Nothing => true,
            ScopeFilter::Any(filters) => filters.iter().all(ScopeFilter::is_empty),
            _ => false,
        }
    }

    /// Append this filter as a boolean SQL expression over `posts`
    #[cfg(feature = "sqlite")]
    pub fn push_sql<'args>(&self, builder: &mut sqlx::QueryBuilder<'args, sqlx::Sqlite>) {
        match self {
            ScopeFilter::All => {
                builder.push("1 = 1");
            }
            ScopeFilter::Nothing => {
                builder.push("1 = 0");
            }
            ScopeFilter::Unrestricted => {
                builder.push("posts.restricted = 0");
            }
            ScopeFilter::OwnedBy(user_id) => {
                builder.push("posts.user_id = ").push_bind(user_id.0);
            }
            ScopeFilter::CollaboratedBy(user_id) => {
                builder
                    .push(
                        "EXISTS (SELECT 1 FROM collaborations \
                         WHERE collaborations.post_id = posts.id \
                         AND collaborations.user_id = ",
                    )
                    .push_bind(user_id.0)
                    .push(")");
            }
            ScopeFilter::Any(filters) if filters.is_empty() => {
                builder.push("1 = 0");
            }
            ScopeFilter::Any(filters) => {
                builder.push("(");
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        builder.push(" OR ");
                    }
                    builder.push("(");
                    filter.push_sql(builder);
                    builder.push(")");
                }
                builder.push(")");
            }
        }
    }
}

impl fmt::Display for ScopeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeFilter::All => write!(f, "all"),
            ScopeFilter::Nothing => write!(f, "nothing"),
            ScopeFilter::Unrestricted => write!(f, "unrestricted"),
            ScopeFilter::OwnedBy(id) => write!(f, "owned_by({})", id),
            ScopeFilter::CollaboratedBy(id) => write!(f, "collaborated_by({})", id),
            ScopeFilter::Any(filters) => {
                write!(f, "any(")?;
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::{Collaboration, PostId};
    use chrono::Utc;

    fn post(owner: i64, restricted: bool, collaborators: &[i64]) -> Post {
        let now = Utc::now();
        Post {
            id: PostId(10),
            owner_id: UserId(owner),
            title: "t".to_string(),
            content: "c".to_string(),
            restricted,
            created_at: now,
            updated_at: now,
            collaborations: collaborators
                .iter()
                .map(|u| Collaboration {
                    user_id: UserId(*u),
                    post_id: PostId(10),
                })
                .collect(),
        }
    }

    #[test]
    fn leaf_filters_match_in_memory() {
        let restricted = post(1, true, &[2]);

        assert!(ScopeFilter::All.matches(&restricted));
        assert!(!ScopeFilter::Nothing.matches(&restricted));
        assert!(!ScopeFilter::Unrestricted.matches(&restricted));
        assert!(ScopeFilter::OwnedBy(UserId(1)).matches(&restricted));
        assert!(!ScopeFilter::OwnedBy(UserId(2)).matches(&restricted));
        assert!(ScopeFilter::CollaboratedBy(UserId(2)).matches(&restricted));
        assert!(!ScopeFilter::CollaboratedBy(UserId(1)).matches(&restricted));
    }

    #[test]
    fn empty_union_matches_nothing() {
        let open = post(1, false, &[]);
        assert!(!ScopeFilter::Any(vec![]).matches(&open));
        assert!(ScopeFilter::Any(vec![]).is_empty());
        assert!(ScopeFilter::Any(vec![ScopeFilter::Nothing, ScopeFilter::Any(vec![])]).is_empty());
        assert!(!ScopeFilter::Any(vec![ScopeFilter::Unrestricted]).is_empty());
    }

    #[test]
    fn display_is_readable() {
        let filter = ScopeFilter::Any(vec![
            ScopeFilter::Unrestricted,
            ScopeFilter::OwnedBy(UserId(4)),
        ]);
        assert_eq!(filter.to_string(), "any(unrestricted, owned_by(4))");
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn renders_union_with_bound_parameters() {
        let filter = ScopeFilter::Any(vec![
            ScopeFilter::Unrestricted,
            ScopeFilter::OwnedBy(UserId(4)),
            ScopeFilter::CollaboratedBy(UserId(4)),
        ]);
        let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new("");
        filter.push_sql(&mut builder);

        assert_eq!(
            builder.sql(),
            "((posts.restricted = 0) OR (posts.user_id = ?) OR (EXISTS (SELECT 1 FROM collaborations \
             WHERE collaborations.post_id = posts.id AND collaborations.user_id = ?)))"
        );
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn renders_constant_filters() {
        for (filter, sql) in [
            (ScopeFilter::All, "1 = 1"),
            (ScopeFilter::Nothing, "1 = 0"),
            (ScopeFilter::Any(vec![]), "1 = 0"),
        ] {
            let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new("");
            filter.push_sql(&mut builder);
            assert_eq!(builder.sql(), sql);
        }
    }
}
