// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes: the current user and the post feed.

use crate::error::{AppError, Result};
use crate::models::{Identity, Post, PostInput};
use crate::services::SessionContext;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes. The session middleware is applied in routes/mod.rs; each
/// handler decides whether an anonymous caller is acceptable.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/{id}", put(update_post).delete(delete_post))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub credits: i64,
}

/// Get the signed-in user's stored record.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionContext>>,
) -> Result<Json<UserResponse>> {
    let identity = session.current();
    let uid = identity.uid().ok_or(AppError::Unauthorized)?;

    let user = state
        .provisioner
        .lookup(uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

    Ok(Json(UserResponse {
        uid: user.uid,
        email: user.email,
        name: user.name,
        picture: user.picture,
        credits: user.credits,
    }))
}

// ─── Posts ───────────────────────────────────────────────────

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: String,
    pub created_at: String,
    /// Whether the caller may edit or delete this post (display hint only)
    pub editable: bool,
}

impl PostResponse {
    fn new(post: Post, viewer: &Identity) -> Self {
        let editable = post.is_owned_by(viewer);
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            user_id: post.user_id,
            user_name: post.user_name,
            user_avatar: post.user_avatar,
            created_at: format_utc_rfc3339(post.created_at),
            editable,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PostsResponse {
    pub posts: Vec<PostResponse>,
}

/// All posts, newest first.
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionContext>>,
) -> Result<Json<PostsResponse>> {
    let viewer = session.current();
    let posts = state.posts.list().await?;

    tracing::debug!(count = posts.len(), "Listing posts");

    Ok(Json(PostsResponse {
        posts: posts
            .into_iter()
            .map(|p| PostResponse::new(p, &viewer))
            .collect(),
    }))
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionContext>>,
    payload: std::result::Result<Json<PostInput>, JsonRejection>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let Json(input) = payload?;
    let author = session.current();
    let post = state.posts.create(input, &author).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::new(post, &author))))
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionContext>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<PostInput>, JsonRejection>,
) -> Result<Json<PostResponse>> {
    let Json(input) = payload?;
    let requester = session.current();
    let post = state.posts.update(&id, input, &requester).await?;
    Ok(Json(PostResponse::new(post, &requester)))
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionContext>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let requester = session.current();
    state.posts.delete(&id, &requester).await?;
    Ok(StatusCode::NO_CONTENT)
}
