//! Actions, resource kinds and authorization targets

use crate::posts::Post;
use serde::{Deserialize, Serialize};

/// Operations a user may attempt on a resource
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Render the form for a new resource
    New,
    /// Persist a new resource
    Create,
    /// List resources
    Index,
    /// Show a single resource
    Show,
    /// Render the edit form
    Edit,
    /// Persist changes
    Update,
    /// Delete a resource
    Destroy,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::New,
        Action::Create,
        Action::Index,
        Action::Show,
        Action::Edit,
        Action::Update,
        Action::Destroy,
    ];

    /// Whether an anonymous caller denied this action should be asked to log in
    pub fn requires_authentication(&self) -> bool {
        match self {
            Action::New | Action::Create | Action::Edit | Action::Update | Action::Destroy => true,
            Action::Index | Action::Show => false,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::New => write!(f, "new"),
            Action::Create => write!(f, "create"),
            Action::Index => write!(f, "index"),
            Action::Show => write!(f, "show"),
            Action::Edit => write!(f, "edit"),
            Action::Update => write!(f, "update"),
            Action::Destroy => write!(f, "destroy"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Action::New),
            "create" => Ok(Action::Create),
            "index" => Ok(Action::Index),
            "show" => Ok(Action::Show),
            "edit" => Ok(Action::Edit),
            "update" => Ok(Action::Update),
            "destroy" => Ok(Action::Destroy),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

/// Resource types known to the policy
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Post,
    User,
    Collaboration,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Post,
        ResourceKind::User,
        ResourceKind::Collaboration,
    ];
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Post => write!(f, "post"),
            ResourceKind::User => write!(f, "user"),
            ResourceKind::Collaboration => write!(f, "collaboration"),
        }
    }
}

/// What an authorization question is asked about: a whole kind or one post
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Kind(ResourceKind),
    Post(&'a Post),
}

impl Target<'_> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Target::Kind(kind) => *kind,
            Target::Post(_) => ResourceKind::Post,
        }
    }
}

impl<'a> From<&'a Post> for Target<'a> {
    fn from(post: &'a Post) -> Self {
        Target::Post(post)
    }
}

impl From<ResourceKind> for Target<'_> {
    fn from(kind: ResourceKind) -> Self {
        Target::Kind(kind)
    }
}
