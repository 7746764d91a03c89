//! User model for storage and API.

use crate::models::Profile;
use serde::{Deserialize, Serialize};

/// Credits granted when a user row is first created.
pub const DEFAULT_CREDITS: i64 = 3;

/// User record stored in Firestore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity provider subject (also used as document ID)
    pub uid: String,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Profile picture URL
    pub picture: Option<String>,
    /// Entitlement balance, only written when the row is created
    pub credits: i64,
}

impl User {
    /// A fresh row for `profile` carrying the default credit grant.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            uid: profile.external_id.clone(),
            email: profile.email.clone(),
            name: profile.display_name.clone(),
            picture: profile.avatar_url.clone(),
            credits: DEFAULT_CREDITS,
        }
    }
}
