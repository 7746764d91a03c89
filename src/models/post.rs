// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post model for storage and API.

use crate::models::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const MAX_TITLE_CHARS: u64 = 200;
pub const MAX_CONTENT_CHARS: u64 = 10_000;

/// Stored post record in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Generated UUID (also used as document ID)
    pub id: String,
    pub title: String,
    pub content: String,
    /// Author uid (immutable)
    pub user_id: String,
    /// Author name at creation time
    pub user_name: String,
    /// Author avatar at creation time
    pub user_avatar: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Display-side ownership check (UI gating only).
    ///
    /// The datastore re-checks ownership on every mutation.
    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        identity.uid() == Some(self.user_id.as_str())
    }
}

/// Title and content supplied on create and update.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostInput {
    #[validate(
        custom(function = "not_blank"),
        length(max = MAX_TITLE_CHARS, message = "title must be at most 200 characters")
    )]
    pub title: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = MAX_CONTENT_CHARS, message = "content must be at most 10000 characters")
    )]
    pub content: String,
}

impl PostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be empty".into()));
    }
    Ok(())
}
