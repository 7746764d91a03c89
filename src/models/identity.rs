// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity types: the provider profile and the signed-in identity.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author name used when a profile carries neither a name nor an email.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Normalized identity attributes returned by the identity provider.
///
/// Every optional field is either a string or `None`; provider values of any
/// other JSON type are dropped in [`Profile::from_claims`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Stable per-provider subject identifier
    pub external_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Build a profile from a provider userinfo document.
    ///
    /// Returns `None` when `sub` is missing, empty or not a string.
    pub fn from_claims(claims: &Value) -> Option<Self> {
        let external_id = string_field(claims, "sub")?;
        if external_id.is_empty() {
            return None;
        }

        Some(Self {
            external_id,
            email: string_field(claims, "email"),
            display_name: string_field(claims, "name"),
            avatar_url: string_field(claims, "picture")
                .or_else(|| string_field(claims, "avatar_url")),
        })
    }
}

fn string_field(claims: &Value, key: &str) -> Option<String> {
    claims.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// A signed-in user as cached in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl SessionUser {
    /// Name snapshotted into posts: display name, then email, then "Unknown".
    pub fn author_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.email.as_deref().filter(|e| !e.is_empty()))
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string()
    }

    /// Avatar snapshotted into posts (empty when the profile has none).
    pub fn author_avatar(&self) -> String {
        self.avatar.clone().unwrap_or_default()
    }
}

impl From<&Profile> for SessionUser {
    fn from(profile: &Profile) -> Self {
        Self {
            uid: profile.external_id.clone(),
            email: profile.email.clone(),
            name: profile.display_name.clone(),
            avatar: profile.avatar_url.clone(),
        }
    }
}

/// Who the current client is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    Authenticated(SessionUser),
    #[default]
    Anonymous,
}

impl Identity {
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }

    pub fn uid(&self) -> Option<&str> {
        self.user().map(|u| u.uid.as_str())
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }
}
