// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post repository: the shared feed and its ownership rules.

use crate::db::{with_timeout, Datastore};
use crate::error::PostError;
use crate::models::{Identity, Post, PostInput, SessionUser};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

#[derive(Clone)]
pub struct PostRepository {
    db: Arc<dyn Datastore>,
    timeout: Duration,
}

fn require_user(identity: &Identity) -> Result<&SessionUser, PostError> {
    identity.user().ok_or(PostError::Unauthenticated)
}

fn validate(input: &PostInput) -> Result<(), PostError> {
    input
        .validate()
        .map_err(|e| PostError::InvalidInput(e.to_string()))
}

impl PostRepository {
    pub fn new(db: Arc<dyn Datastore>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// All posts, newest first.
    pub async fn list(&self) -> Result<Vec<Post>, PostError> {
        Ok(with_timeout(self.timeout, self.db.list_posts()).await?)
    }

    /// Publish a post as `author`, snapshotting the author's name and avatar.
    pub async fn create(&self, input: PostInput, author: &Identity) -> Result<Post, PostError> {
        let author = require_user(author)?;
        validate(&input)?;

        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            content: input.content,
            user_id: author.uid.clone(),
            user_name: author.author_name(),
            user_avatar: author.author_avatar(),
            created_at: chrono::Utc::now(),
        };

        with_timeout(self.timeout, self.db.insert_post(&post)).await?;

        tracing::info!(post_id = %post.id, uid = %post.user_id, "Post created");
        Ok(post)
    }

    /// Replace title and content. Only the author may do this.
    pub async fn update(
        &self,
        id: &str,
        input: PostInput,
        requester: &Identity,
    ) -> Result<Post, PostError> {
        let requester = require_user(requester)?;
        validate(&input)?;

        let post = with_timeout(
            self.timeout,
            self.db.update_post(id, &requester.uid, &input),
        )
        .await
        .map_err(|e| {
            tracing::debug!(post_id = id, uid = %requester.uid, error = %e, "Post update refused");
            PostError::from(e)
        })?;

        tracing::info!(post_id = id, uid = %requester.uid, "Post updated");
        Ok(post)
    }

    /// Permanently remove a post. Only the author may do this.
    pub async fn delete(&self, id: &str, requester: &Identity) -> Result<(), PostError> {
        let requester = require_user(requester)?;

        with_timeout(self.timeout, self.db.delete_post(id, &requester.uid))
            .await
            .map_err(|e| {
                tracing::debug!(post_id = id, uid = %requester.uid, error = %e, "Post delete refused");
                PostError::from(e)
            })?;

        tracing::info!(post_id = id, uid = %requester.uid, "Post deleted");
        Ok(())
    }
}
