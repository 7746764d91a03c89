// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (provisioned profiles and credit balance)
//! - Posts (the shared feed)
//!
//! Conflicts are resolved by Firestore write preconditions, never by a
//! read followed by an unconditional write.

use crate::db::{collections, Datastore, StoreError};
use crate::models::{Post, PostInput, User};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{paths, FirestoreQueryDirection, FirestoreWritePrecondition};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

fn unavailable(err: FirestoreError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client.as_ref().ok_or_else(|| {
            StoreError::Unavailable("Database not connected (offline mode)".to_string())
        })
    }

    /// Load a post and confirm `requester_uid` authored it.
    async fn owned_post(&self, id: &str, requester_uid: &str) -> Result<Post, StoreError> {
        let post = self.get_post(id).await?.ok_or(StoreError::NotFound)?;
        if post.user_id != requester_uid {
            tracing::warn!(
                post_id = id,
                owner = %post.user_id,
                requester = requester_uid,
                "Rejected mutation by non-author"
            );
            return Err(StoreError::OwnershipMismatch);
        }
        Ok(post)
    }
}

#[async_trait]
impl Datastore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    /// Create-if-absent, then field-masked update on conflict.
    ///
    /// The create carries an exists=false precondition, so at most one
    /// sign-in ever writes `credits`. The fallback update is restricted to the
    /// profile fields and requires the document to exist.
    async fn upsert_user(&self, user: &User) -> Result<User, StoreError> {
        let client = self.get_client()?;

        let created: Result<User, FirestoreError> = client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await;

        match created {
            Ok(stored) => {
                tracing::info!(uid = %user.uid, credits = stored.credits, "Created user");
                return Ok(stored);
            }
            Err(FirestoreError::DataConflictError(_)) => {
                tracing::debug!(uid = %user.uid, "User exists, updating profile fields");
            }
            Err(e) => return Err(unavailable(e)),
        }

        client
            .fluent()
            .update()
            .fields(paths!(User::{email, name, picture}))
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(unavailable)
    }

    async fn get_user(&self, uid: &str) -> Result<Option<User>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(unavailable)
    }

    // ─── Post Operations ─────────────────────────────────────────

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        let _: Post = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::POSTS)
            .document_id(&post.id)
            .object(post)
            .execute()
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::POSTS)
            .obj()
            .one(id)
            .await
            .map_err(unavailable)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::POSTS)
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(unavailable)
    }

    async fn update_post(
        &self,
        id: &str,
        requester_uid: &str,
        changes: &PostInput,
    ) -> Result<Post, StoreError> {
        // Author is immutable, so the ownership read cannot go stale before the write.
        let mut post = self.owned_post(id, requester_uid).await?;
        post.title = changes.title.clone();
        post.content = changes.content.clone();

        let updated = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(Post::{title, content}))
            .in_col(collections::POSTS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(&post)
            .execute()
            .await;

        match updated {
            Ok(stored) => Ok(stored),
            Err(FirestoreError::DataNotFoundError(_)) => Err(StoreError::NotFound),
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn delete_post(&self, id: &str, requester_uid: &str) -> Result<(), StoreError> {
        self.owned_post(id, requester_uid).await?;

        let deleted = self
            .get_client()?
            .fluent()
            .delete()
            .from(collections::POSTS)
            .document_id(id)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .execute()
            .await;

        match deleted {
            Ok(()) => Ok(()),
            Err(FirestoreError::DataNotFoundError(_)) => Err(StoreError::NotFound),
            Err(e) => Err(unavailable(e)),
        }
    }
}
