//! Error type shared by the Inkwell crates
//!
//! Every variant except `Io` carries an [`ErrorContext`], so a failure seen by
//! an operator can be matched to its log line through the error id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type InkwellResult<T> = Result<T, InkwellError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where and when an error happened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    pub error_id: String,
    pub occurred_at: DateTime<Utc>,
    /// Crate area that raised the error, e.g. `config` or `posts`
    pub component: String,
    pub operation: Option<String>,
    /// Operator-facing hints
    pub hints: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            occurred_at: Utc::now(),
            component: component.to_string(),
            operation: None,
            hints: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hints.push(hint.to_string());
        self
    }
}

#[derive(Error, Debug)]
pub enum InkwellError {
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<BoxError>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxError>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl InkwellError {
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            InkwellError::Storage { context, .. }
            | InkwellError::Config { context, .. }
            | InkwellError::Validation { context, .. }
            | InkwellError::NotFound { context, .. }
            | InkwellError::Internal { context, .. } => Some(context),
            InkwellError::Io(_) => None,
        }
    }

    pub fn error_id(&self) -> Option<&str> {
        self.context().map(|c| c.error_id.as_str())
    }

    /// Transient failures worth retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, InkwellError::Storage { .. } | InkwellError::Io(_))
    }

    /// Log the error once, at a level matching its severity
    pub fn report(&self) {
        let component = self.context().map(|c| c.component.as_str());
        if self.is_recoverable() {
            warn!(error_id = ?self.error_id(), component = ?component, error = %self, "Recoverable failure");
        } else {
            error!(error_id = ?self.error_id(), component = ?component, error = %self, "Failure");
        }
    }
}

#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::InkwellError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::InkwellError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $operation:expr) => {
        $crate::InkwellError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new("config").with_operation($operation),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::InkwellError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! not_found_error {
    ($resource:expr, $component:expr) => {
        $crate::InkwellError::NotFound {
            resource: $resource.to_string(),
            context: $crate::ErrorContext::new($component),
        }
    };
}
