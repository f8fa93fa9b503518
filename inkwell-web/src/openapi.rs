//! OpenAPI document for the Inkwell API

use axum::response::Json;
use inkwell_app::{Collaboration, NewPost, Post, PostChanges, PostId, UserId};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::handlers::{HealthResponse, PostForm};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inkwell API",
        version = "0.1.0",
        description = "Posts with owners, collaborators and access control",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::list_posts,
        crate::handlers::new_post,
        crate::handlers::create_post,
        crate::handlers::show_post,
        crate::handlers::edit_post,
        crate::handlers::update_post,
        crate::handlers::delete_post,
    ),
    components(
        schemas(
            HealthResponse,
            PostForm,
            Post,
            NewPost,
            PostChanges,
            Collaboration,
            PostId,
            UserId,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Posts", description = "Post management under access control"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Declares the identity header
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-User-Id"))),
            );
        }
    }
}

/// Serve the document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_post_routes() {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "Inkwell API");
        assert!(openapi.paths.paths.contains_key("/api/posts"));
        assert!(openapi.paths.paths.contains_key("/api/posts/{id}"));
        assert!(openapi.paths.paths.contains_key("/api/posts/{id}/edit"));
    }

    #[test]
    fn identity_header_is_declared() {
        let json = ApiDoc::openapi().to_pretty_json().unwrap();
        assert!(json.contains("X-User-Id"));
    }
}
