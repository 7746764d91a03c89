// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session JWT handling and the session-loading middleware.

use crate::models::{Identity, SessionUser};
use crate::services::SessionContext;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie carrying the signed session JWT.
pub const SESSION_COOKIE: &str = "postboard_session";
/// Cookie carrying the identity provider access token.
pub const PROVIDER_TOKEN_COOKIE: &str = "postboard_provider_token";

/// Session lifetime in seconds (30 days).
pub const SESSION_TTL_SECS: usize = 30 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user uid)
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Create a JWT for a user session.
pub fn create_jwt(user: &SessionUser, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user.uid.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        picture: user.avatar.clone(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Decode a session JWT; `None` if it is invalid or expired.
pub fn decode_session(token: &str, signing_key: &[u8]) -> Option<SessionUser> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let claims = decode::<Claims>(token, &key, &validation).ok()?.claims;
    if claims.sub.is_empty() {
        return None;
    }

    Some(SessionUser {
        uid: claims.sub,
        email: claims.email,
        name: claims.name,
        avatar: claims.picture,
    })
}

/// Build the request's [`SessionContext`] from its cookies.
///
/// The session cookie is tried first, then an `Authorization: Bearer` header.
/// Missing or invalid tokens yield an anonymous context; rejecting anonymous
/// callers is left to the handlers.
pub async fn load_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        Some(cookie.value().to_string())
    } else {
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string)
    };

    let identity = token
        .as_deref()
        .and_then(|t| decode_session(t, &state.config.jwt_signing_key))
        .map(Identity::Authenticated)
        .unwrap_or_default();

    if token.is_some() && identity.is_anonymous() {
        tracing::debug!("Ignoring invalid session token");
    }

    let provider_token = if identity.is_anonymous() {
        None
    } else {
        jar.get(PROVIDER_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
    };

    request
        .extensions_mut()
        .insert(Arc::new(SessionContext::new(identity, provider_token)));

    next.run(request).await
}
