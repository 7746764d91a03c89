// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process datastore for local development and tests.
//!
//! Holds both collections behind a single `tokio::sync::RwLock`, so every
//! write (including the user upsert) is one critical section. Data is lost
//! when the store is dropped.

use crate::db::{Datastore, StoreError};
use crate::models::{Post, PostInput, User};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, User>,
    posts: HashMap<String, Post>,
}

/// Memory-backed [`Datastore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn post_count(&self) -> usize {
        self.tables.read().await.posts.len()
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn upsert_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .entry(user.uid.clone())
            .and_modify(|existing| {
                existing.email = user.email.clone();
                existing.name = user.name.clone();
                existing.picture = user.picture.clone();
            })
            .or_insert_with(|| user.clone());
        Ok(stored.clone())
    }

    async fn get_user(&self, uid: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(uid).cloned())
    }

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.posts.contains_key(&post.id) {
            return Err(StoreError::Unavailable(format!(
                "post {} already exists",
                post.id
            )));
        }
        tables.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.tables.read().await.posts.get(id).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let mut posts: Vec<Post> = self.tables.read().await.posts.values().cloned().collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(posts)
    }

    async fn update_post(
        &self,
        id: &str,
        requester_uid: &str,
        changes: &PostInput,
    ) -> Result<Post, StoreError> {
        let mut tables = self.tables.write().await;
        let post = tables.posts.get_mut(id).ok_or(StoreError::NotFound)?;
        if post.user_id != requester_uid {
            return Err(StoreError::OwnershipMismatch);
        }
        post.title = changes.title.clone();
        post.content = changes.content.clone();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: &str, requester_uid: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let post = tables.posts.get(id).ok_or(StoreError::NotFound)?;
        if post.user_id != requester_uid {
            return Err(StoreError::OwnershipMismatch);
        }
        tables.posts.remove(id);
        Ok(())
    }
}
