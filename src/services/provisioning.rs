// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User provisioning: create-or-update the local user for a profile.

use crate::db::{with_timeout, Datastore};
use crate::error::ProvisionError;
use crate::models::{Profile, User};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct Provisioner {
    db: Arc<dyn Datastore>,
    timeout: Duration,
}

impl Provisioner {
    pub fn new(db: Arc<dyn Datastore>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Upsert the user keyed by `profile.external_id`.
    ///
    /// New rows get the default credits; existing rows only have their
    /// profile fields refreshed.
    pub async fn provision(&self, profile: &Profile) -> Result<User, ProvisionError> {
        let candidate = User::from_profile(profile);

        let user = with_timeout(self.timeout, self.db.upsert_user(&candidate))
            .await
            .map_err(|e| {
                tracing::error!(uid = %candidate.uid, error = %e, "Failed to provision user");
                ProvisionError::from(e)
            })?;

        tracing::info!(uid = %user.uid, credits = user.credits, "User provisioned");
        Ok(user)
    }

    /// Stored row for `uid`, if provisioned.
    pub async fn lookup(&self, uid: &str) -> Result<Option<User>, ProvisionError> {
        Ok(with_timeout(self.timeout, self.db.get_user(uid)).await?)
    }
}
