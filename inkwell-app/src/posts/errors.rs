//! Post-specific error types and handling

use super::types::{FieldErrors, PostId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Post operation result type
pub type PostResult<T> = Result<T, PostError>;

/// Structured error types for post operations
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "error_type", content = "details")]
pub enum PostError {
    /// Post not found
    #[error("Post not found: {post_id}")]
    NotFound { post_id: PostId },

    /// User not found
    #[error("User not found: {reference}")]
    UserNotFound { reference: String },

    /// Field validation failed
    #[error("Validation failed: {}", summarize(.errors))]
    Validation { errors: FieldErrors },

    /// Storage backend failure
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        component: String,
        error_id: String,
        recoverable: bool,
    },
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{} {}", field, m)))
        .collect::<Vec<_>>()
        .join(", ")
}

impl PostError {
    /// Single-field validation error
    pub fn invalid(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::Validation { errors }
    }

    /// Storage error tagged with a fresh error id
    pub fn storage(component: &str, message: impl Into<String>, recoverable: bool) -> Self {
        Self::Storage {
            message: message.into(),
            component: component.to_string(),
            error_id: uuid::Uuid::new_v4().to_string(),
            recoverable,
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Storage { recoverable, .. } => *recoverable,
            Self::NotFound { .. } | Self::UserNotFound { .. } | Self::Validation { .. } => false,
        }
    }

    /// Get error category for logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::UserNotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::Storage { .. } => "storage",
        }
    }

    /// Convert to HTTP status code
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } | Self::UserNotFound { .. } => 404,
            Self::Validation { .. } => 422,
            Self::Storage { .. } => 500,
        }
    }
}

impl From<FieldErrors> for PostError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation { errors }
    }
}

impl From<PostError> for inkwell_core::InkwellError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::NotFound { post_id } => {
                inkwell_core::not_found_error!(format!("post {}", post_id), "posts")
            }
            PostError::UserNotFound { reference } => {
                inkwell_core::not_found_error!(format!("user {}", reference), "posts")
            }
            PostError::Validation { ref errors } => {
                let field = errors.keys().next().cloned().unwrap_or_default();
                inkwell_core::validation_error!(err.to_string(), field, "posts")
            }
            PostError::Storage {
                message,
                recoverable: true,
                ..
            } => inkwell_core::storage_error!(message, "posts"),
            PostError::Storage {
                message, component, ..
            } => inkwell_core::InkwellError::Internal {
                message,
                context: inkwell_core::ErrorContext::new(&component),
            },
        }
    }
}
