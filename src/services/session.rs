// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client session context.
//!
//! One context is built per client from its session cookies and handed to
//! the handlers that need to know who is signed in. Every identity change
//! bumps an epoch; a `refresh()` whose provider call straddles a change drops
//! its result instead of overwriting the newer identity.

use crate::error::AuthError;
use crate::models::{Identity, SessionUser};
use crate::services::identity::IdentityGateway;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct SessionState {
    identity: Identity,
    provider_token: Option<String>,
    epoch: u64,
}

#[derive(Debug)]
pub struct SessionContext {
    state: Mutex<SessionState>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl SessionContext {
    pub fn new(identity: Identity, provider_token: Option<String>) -> Self {
        Self {
            state: Mutex::new(SessionState {
                identity,
                provider_token,
                epoch: 0,
            }),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(Identity::Anonymous, None)
    }

    pub fn signed_in(user: SessionUser, provider_token: Option<String>) -> Self {
        Self::new(Identity::Authenticated(user), provider_token)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last known identity.
    pub fn current(&self) -> Identity {
        self.lock().identity.clone()
    }

    pub fn provider_token(&self) -> Option<String> {
        self.lock().provider_token.clone()
    }

    fn set(state: &mut SessionState, identity: Identity) {
        if identity.is_anonymous() {
            state.provider_token = None;
        }
        state.identity = identity;
        state.epoch += 1;
    }

    /// Re-query the provider and cache what it says.
    ///
    /// Without a provider token the client is anonymous and the provider is
    /// not contacted. On error the cached identity is left as it was.
    pub async fn refresh(&self, gateway: &dyn IdentityGateway) -> Result<Identity, AuthError> {
        let (token, epoch) = {
            let state = self.lock();
            (state.provider_token.clone(), state.epoch)
        };

        let resolved = match token {
            Some(token) => match gateway.current_profile(&token).await? {
                Some(profile) => Identity::Authenticated(SessionUser::from(&profile)),
                None => Identity::Anonymous,
            },
            None => Identity::Anonymous,
        };

        let mut state = self.lock();
        if state.epoch != epoch {
            tracing::debug!("Discarding refresh result for a superseded session");
            return Ok(state.identity.clone());
        }
        Self::set(&mut state, resolved.clone());
        Ok(resolved)
    }

    /// Revoke the provider session (best effort) and become anonymous.
    pub async fn sign_out(&self, gateway: &dyn IdentityGateway) {
        let token = {
            let mut state = self.lock();
            state.epoch += 1;
            state.provider_token.clone()
        };

        if let Some(token) = token {
            if let Err(e) = gateway.sign_out(&token).await {
                tracing::warn!(error = %e, "Provider sign-out failed, clearing local session anyway");
            }
        }

        let mut state = self.lock();
        Self::set(&mut state, Identity::Anonymous);
    }
}
