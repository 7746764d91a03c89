//! Database layer.
//!
//! [`Datastore`] is the contract the services program against. It is the
//! single source of truth and owns all conflict resolution: the user upsert is
//! keyed on `uid`, and every post mutation re-checks the author against the
//! requester before writing.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::models::{Post, PostInput, User};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";
}

/// Datastore-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found")]
    NotFound,

    /// The requester is not the row's author.
    #[error("Requester does not own this document")]
    OwnershipMismatch,

    #[error("Datastore unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Datastore: Send + Sync {
    /// Insert `user` if no row exists for `user.uid`, otherwise overwrite
    /// `email`, `name` and `picture` only. Returns the stored row.
    async fn upsert_user(&self, user: &User) -> Result<User, StoreError>;

    async fn get_user(&self, uid: &str) -> Result<Option<User>, StoreError>;

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError>;

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError>;

    /// All posts, newest first.
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;

    /// Replace title and content of a post authored by `requester_uid`.
    async fn update_post(
        &self,
        id: &str,
        requester_uid: &str,
        changes: &PostInput,
    ) -> Result<Post, StoreError>;

    /// Permanently remove a post authored by `requester_uid`.
    async fn delete_post(&self, id: &str, requester_uid: &str) -> Result<(), StoreError>;
}

/// Bound a datastore call; an elapsed timer is reported as `Unavailable`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "Datastore call timed out");
            Err(StoreError::Unavailable(format!(
                "timed out after {}ms",
                limit.as_millis()
            )))
        }
    }
}
