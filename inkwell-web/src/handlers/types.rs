//! Response types shared by the handlers

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Whether the post store answered
    pub storage_ok: bool,
}

/// Editable fields of a post, with collaborators as emails
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostForm {
    #[schema(example = "Hot Day")]
    pub title: String,
    pub content: String,
    pub restricted: bool,
    #[schema(example = json!(["bob@example.com"]))]
    pub collaborator_emails: Vec<String>,
}
