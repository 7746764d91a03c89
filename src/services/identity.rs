// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider gateway.
//!
//! Handles:
//! - Building the authorization redirect (sign-in trigger)
//! - Exchanging the one-time authorization code for a provider session
//! - Looking up the profile behind a provider access token
//! - Revoking the provider session on sign-out

use crate::config::Config;
use crate::error::AuthError;
use crate::models::Profile;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

const SCOPES: &str = "openid email profile";

/// Tokens returned by a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub access_token: String,
    /// Seconds until `access_token` expires, if the provider says
    pub expires_in: Option<u64>,
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Provider URL the browser is sent to for interactive sign-in.
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange_code_for_session(&self, code: &str) -> Result<ProviderSession, AuthError>;

    /// Profile of the session behind `access_token`; `None` when the provider
    /// no longer recognizes it.
    async fn current_profile(&self, access_token: &str) -> Result<Option<Profile>, AuthError>;

    /// Revoke the provider session. Revoking twice is not an error.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// [`IdentityGateway`] for an OpenID Connect provider (Google by default).
#[derive(Clone)]
pub struct OidcGateway {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorize_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
    revoke_endpoint: String,
}

impl OidcGateway {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            .build()
            .context("failed building identity provider HTTP client")?;

        tracing::info!(
            client_id = %config.oidc_client_id,
            redirect_uri = %config.callback_url(),
            "Initialized OIDC identity gateway"
        );

        Ok(Self {
            http,
            client_id: config.oidc_client_id.clone(),
            client_secret: config.oidc_client_secret.clone(),
            redirect_uri: config.callback_url(),
            authorize_endpoint: config.oidc.authorize_url.clone(),
            token_endpoint: config.oidc.token_url.clone(),
            userinfo_endpoint: config.oidc.userinfo_url.clone(),
            revoke_endpoint: config.oidc.revoke_url.clone(),
        })
    }
}

#[async_trait]
impl IdentityGateway for OidcGateway {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.authorize_endpoint,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code_for_session(&self, code: &str) -> Result<ProviderSession, AuthError> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Identity provider rejected authorization code");
            return Err(AuthError::ExchangeFailed(format!("HTTP {}: {}", status, body)));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("malformed token response: {}", e)))?;

        Ok(ProviderSession {
            access_token: tokens.access_token,
            expires_in: tokens.expires_in,
        })
    }

    async fn current_profile(&self, access_token: &str) -> Result<Option<Profile>, AuthError> {
        let response = self
            .http
            .get(&self.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::LookupFailed(format!("userinfo request failed: {}", e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::LookupFailed(format!("HTTP {}: {}", status, body)));
        }

        let claims: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::LookupFailed(format!("malformed userinfo: {}", e)))?;

        Profile::from_claims(&claims)
            .map(Some)
            .ok_or_else(|| AuthError::LookupFailed("userinfo has no subject".to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(&self.revoke_endpoint)
            .form(&[("token", access_token)])
            .send()
            .await
            .map_err(|e| AuthError::LookupFailed(format!("revoke request failed: {}", e)))?;

        let status = response.status();
        // Revoked or expired tokens come back as 400/401.
        if status.is_success()
            || status == StatusCode::BAD_REQUEST
            || status == StatusCode::UNAUTHORIZED
        {
            tracing::debug!(status = %status, "Provider session revoked");
            return Ok(());
        }

        Err(AuthError::LookupFailed(format!("revoke returned HTTP {}", status)))
    }
}
