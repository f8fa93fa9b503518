//! Inkwell Web Server
//!
//! HTTP boundary for Inkwell posts. Every post handler loads the target,
//! asks the caller's [`inkwell_app::Ability`], and only then acts.

pub mod auth;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use auth::{AccessDenied, CurrentIdentity, Guard};
pub use server::{InkwellServer, InkwellServerBuilder};
pub use state::AppState;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use inkwell_app::PostError;
use inkwell_core::{InkwellError, LoggingConfig};
use tower_http::trace::TraceLayer;
use tracing::error;

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Post(#[from] PostError),

    #[error(transparent)]
    Core(#[from] InkwellError),

    #[error("Access denied: {0}")]
    Denied(#[from] AccessDenied),

    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::Denied(denied) => denied.into_response(),
            WebError::Body(rejection) => rejection.into_response(),
            WebError::Post(PostError::Validation { errors }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "errors": errors })),
            )
                .into_response(),
            WebError::Post(err @ (PostError::NotFound { .. } | PostError::UserNotFound { .. })) => {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({ "status": 404, "message": err.to_string() })),
                )
                    .into_response()
            }
            WebError::Core(err) => {
                err.report();
                internal_error()
            }
            other => {
                error!(error = %other, "Request failed");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "status": 500,
            "message": "Internal server error",
        })),
    )
        .into_response()
}

/// Initialize logging for the web server
pub fn init_logging(config: &LoggingConfig) -> WebResult<()> {
    inkwell_core::init_logging(config)
        .map_err(|e| WebError::Config(format!("Failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell_app::PostId;

    #[test]
    fn validation_errors_are_unprocessable() {
        let err = WebError::from(PostError::invalid("title", "can't be blank"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn missing_posts_are_not_found() {
        let err = WebError::from(PostError::NotFound { post_id: PostId(9) });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn body_rejections_keep_their_status() {
        use axum::extract::rejection::MissingJsonContentType;

        let err = WebError::from(JsonRejection::from(MissingJsonContentType::default()));
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn storage_errors_are_internal() {
        let err = WebError::from(PostError::storage("sqlite", "disk I/O error", true));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
