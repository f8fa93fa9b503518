//! Post handlers
//!
//! Member actions load the post first, so a missing id is a 404 for everyone,
//! and then authorize against the loaded record. Request bodies are parsed
//! only after authorization succeeds.

use super::types::PostForm;
use crate::{auth::Guard, AppState, WebResult};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use inkwell_app::{Action, NewPost, Post, PostChanges, PostId, PostListing, ResourceKind};
use tracing::debug;

/// List the posts the caller may see
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "Posts",
    summary = "List posts",
    description = "Posts visible to the caller, optionally narrowed by owner or by having collaborators",
    params(
        ("created_by" = Option<i64>, Query, description = "Only posts owned by this user"),
        ("with_collaborators" = Option<bool>, Query, description = "Only posts with at least one collaborator")
    ),
    responses(
        (status = 200, description = "Visible posts", body = Vec<Post>)
    ),
    security(("user_id" = []), ())
)]
pub async fn list_posts(
    State(state): State<AppState>,
    guard: Guard,
    Query(listing): Query<PostListing>,
) -> WebResult<Json<Vec<Post>>> {
    guard.authorize(Action::Index, ResourceKind::Post)?;
    let posts = state.posts.list(guard.ability(), &listing).await?;
    Ok(Json(posts))
}

/// Blank form for a new post
#[utoipa::path(
    get,
    path = "/api/posts/new",
    tag = "Posts",
    summary = "New post form",
    responses(
        (status = 200, description = "Default field values", body = NewPost),
        (status = 302, description = "Anonymous caller redirected to login"),
        (status = 403, description = "Not allowed")
    ),
    security(("user_id" = []))
)]
pub async fn new_post(guard: Guard) -> WebResult<Json<NewPost>> {
    guard.authorize(Action::New, ResourceKind::Post)?;
    Ok(Json(NewPost::default()))
}

/// Create a post owned by the caller
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "Posts",
    summary = "Create post",
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 302, description = "Anonymous caller redirected to login"),
        (status = 403, description = "Not allowed"),
        (status = 422, description = "Invalid fields")
    ),
    security(("user_id" = []))
)]
pub async fn create_post(
    State(state): State<AppState>,
    guard: Guard,
    body: Result<Json<NewPost>, JsonRejection>,
) -> WebResult<Response> {
    guard.authorize(Action::Create, ResourceKind::Post)?;
    let owner = guard
        .identity()
        .user_id()
        .ok_or_else(|| guard.deny(Action::Create))?;
    let Json(new_post) = body?;

    let post = state.posts.create(owner, new_post).await?;
    let location = format!("/api/posts/{}", post.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(post),
    )
        .into_response())
}

/// Show a single post
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "Posts",
    summary = "Show post",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = Post),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "No such post")
    ),
    security(("user_id" = []), ())
)]
pub async fn show_post(
    State(state): State<AppState>,
    guard: Guard,
    Path(id): Path<PostId>,
) -> WebResult<Json<Post>> {
    let post = state.posts.find(id).await?;
    guard.authorize(Action::Show, &post)?;
    Ok(Json(post))
}

/// Editable fields of a post
#[utoipa::path(
    get,
    path = "/api/posts/{id}/edit",
    tag = "Posts",
    summary = "Edit post form",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Current field values", body = PostForm),
        (status = 302, description = "Redirected to login or back"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "No such post")
    ),
    security(("user_id" = []))
)]
pub async fn edit_post(
    State(state): State<AppState>,
    guard: Guard,
    Path(id): Path<PostId>,
) -> WebResult<Json<PostForm>> {
    let post = state.posts.find(id).await?;
    guard.authorize(Action::Edit, &post)?;

    let mut collaborator_emails = Vec::new();
    for user_id in post.collaborator_ids() {
        match state.posts.find_user(user_id).await? {
            Some(user) => collaborator_emails.push(user.email),
            None => debug!(post_id = %post.id, %user_id, "Collaborator without a user row"),
        }
    }

    Ok(Json(PostForm {
        title: post.title,
        content: post.content,
        restricted: post.restricted,
        collaborator_emails,
    }))
}

/// Update a post; collaborators are replaced when emails are given
#[utoipa::path(
    patch,
    path = "/api/posts/{id}",
    tag = "Posts",
    summary = "Update post",
    params(("id" = i64, Path, description = "Post id")),
    request_body = PostChanges,
    responses(
        (status = 200, description = "Updated post", body = Post),
        (status = 302, description = "Redirected to login or back"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "No such post"),
        (status = 422, description = "Invalid fields")
    ),
    security(("user_id" = []))
)]
pub async fn update_post(
    State(state): State<AppState>,
    guard: Guard,
    Path(id): Path<PostId>,
    body: Result<Json<PostChanges>, JsonRejection>,
) -> WebResult<Json<Post>> {
    let post = state.posts.find(id).await?;
    guard.authorize(Action::Update, &post)?;
    let Json(changes) = body?;
    let post = state.posts.update(post, changes).await?;
    Ok(Json(post))
}

/// Delete a post
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "Posts",
    summary = "Delete post",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 302, description = "Redirected to login or back"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "No such post")
    ),
    security(("user_id" = []))
)]
pub async fn delete_post(
    State(state): State<AppState>,
    guard: Guard,
    Path(id): Path<PostId>,
) -> WebResult<StatusCode> {
    let post = state.posts.find(id).await?;
    guard.authorize(Action::Destroy, &post)?;
    state.posts.destroy(post.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
