//! Route definitions for the Inkwell web server

use crate::{handlers, openapi, AppState};
use axum::{routing::get, Router};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Posts
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/posts/new", get(handlers::new_post))
        .route(
            "/posts/{id}",
            get(handlers::show_post)
                .patch(handlers::update_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/posts/{id}/edit", get(handlers::edit_post))
        // API documentation
        .route("/openapi.json", get(openapi::openapi_json))
}
