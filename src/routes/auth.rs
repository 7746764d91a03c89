// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in, sign-in completion, session refresh and sign-out routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    create_jwt, PROVIDER_TOKEN_COOKIE, SESSION_COOKIE, SESSION_TTL_SECS,
};
use crate::models::{Identity, SessionUser};
use crate::services::oauth_state::{generate_nonce, now_millis, sign_state, verify_state};
use crate::services::SessionContext;
use crate::AppState;

/// Cookie binding an in-flight sign-in to the browser that started it.
pub const NONCE_COOKIE: &str = "postboard_oauth_nonce";
const CALLBACK_PATH: &str = "/auth/callback";
const NONCE_TTL_SECS: i64 = 10 * 60;

/// Routes with no session requirement.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", get(auth_login))
        .route(CALLBACK_PATH, get(auth_callback))
}

/// Routes that act on the caller's session (session middleware applied in routes/mod.rs).
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/refresh", post(refresh_session))
        .route("/auth/logout", post(logout))
}

// ─── Cookies ─────────────────────────────────────────────────

/// Cookies are `Secure` unless the frontend is served from localhost.
fn use_secure_cookies(frontend_url: &str) -> bool {
    !(frontend_url.starts_with("http://localhost") || frontend_url.starts_with("http://127.0.0.1"))
}

fn base_cookie(
    name: &'static str,
    value: String,
    path: &'static str,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn with_max_age(mut cookie: Cookie<'static>, secs: i64) -> Cookie<'static> {
    cookie.set_max_age(time::Duration::seconds(secs));
    cookie
}

fn removal(mut cookie: Cookie<'static>) -> Cookie<'static> {
    cookie.make_removal();
    cookie
}

fn session_cookies(
    jar: CookieJar,
    jwt: String,
    provider_token: Option<(String, Option<u64>)>,
    secure: bool,
) -> CookieJar {
    let jar = jar.add(with_max_age(
        base_cookie(SESSION_COOKIE, jwt, "/", secure),
        SESSION_TTL_SECS as i64,
    ));

    match provider_token {
        Some((token, expires_in)) => {
            let ttl = expires_in
                .map(|s| s.min(SESSION_TTL_SECS as u64) as i64)
                .unwrap_or(SESSION_TTL_SECS as i64);
            jar.add(with_max_age(
                base_cookie(PROVIDER_TOKEN_COOKIE, token, "/", secure),
                ttl,
            ))
        }
        None => jar,
    }
}

fn clear_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(removal(base_cookie(
        SESSION_COOKIE,
        String::new(),
        "/",
        secure,
    )))
    .add(removal(base_cookie(
        PROVIDER_TOKEN_COOKIE,
        String::new(),
        "/",
        secure,
    )))
}

fn clear_nonce_cookie(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(removal(base_cookie(
        NONCE_COOKIE,
        String::new(),
        CALLBACK_PATH,
        secure,
    )))
}

// ─── Redirect targets ───────────────────────────────────────

fn landing_url(frontend_url: &str) -> String {
    format!("{}/dashboard", frontend_url.trim_end_matches('/'))
}

fn login_error_url(frontend_url: &str, error: &str, msg: Option<&str>) -> String {
    let base = format!("{}/login?error={}", frontend_url.trim_end_matches('/'), error);
    match msg {
        Some(msg) => format!("{}&msg={}", base, urlencoding::encode(msg)),
        None => base,
    }
}

// ─── Sign-in trigger ────────────────────────────────────────

/// Start sign-in: redirect to the identity provider with a signed state.
async fn auth_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let nonce = generate_nonce()?;
    let oauth_state = sign_state(&nonce, now_millis()?, &state.config.oauth_state_key)?;
    let secure = use_secure_cookies(&state.config.frontend_url);

    let jar = jar.add(with_max_age(
        base_cookie(NONCE_COOKIE, nonce, CALLBACK_PATH, secure),
        NONCE_TTL_SECS,
    ));

    tracing::info!(
        client_id = %state.config.oidc_client_id,
        "Starting sign-in, redirecting to identity provider"
    );

    Ok((jar, Redirect::temporary(&state.identity.authorize_url(&oauth_state))))
}

// ─── Sign-in completion ─────────────────────────────────────

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn state_matches_nonce(state: &AppState, oauth_state: Option<&str>, nonce: Option<&str>) -> bool {
    let (Some(oauth_state), Some(nonce)) = (oauth_state, nonce) else {
        return false;
    };
    let Ok(now) = now_millis() else {
        return false;
    };
    verify_state(oauth_state, &state.config.oauth_state_key, now)
        .map(|embedded| bool::from(embedded.as_bytes().ct_eq(nonce.as_bytes())))
        .unwrap_or(false)
}

/// Completion entrypoint: exchange the code, provision the user, start a session.
///
/// This is the one place where identity and provisioning errors become
/// redirects instead of error responses.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let frontend_url = state.config.frontend_url.as_str();
    let secure = use_secure_cookies(frontend_url);
    let auth_failed = Redirect::temporary(&login_error_url(frontend_url, "auth", None));

    let nonce = jar.get(NONCE_COOKIE).map(|c| c.value().to_string());
    let jar = clear_nonce_cookie(jar, secure);

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return (jar, Redirect::temporary(&landing_url(frontend_url)));
    };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Identity provider returned an error");
        return (jar, auth_failed);
    }

    if !state_matches_nonce(&state, params.state.as_deref(), nonce.as_deref()) {
        tracing::warn!("Invalid, expired or unbound sign-in state");
        return (jar, auth_failed);
    }

    tracing::info!("Exchanging authorization code for a provider session");

    let session = match state.identity.exchange_code_for_session(&code).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Error exchanging code for session");
            return (jar, auth_failed);
        }
    };

    let profile = match state.identity.current_profile(&session.access_token).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::warn!("No user found after session exchange");
            return (jar, auth_failed);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Profile lookup failed after session exchange");
            return (jar, auth_failed);
        }
    };

    let user = match state.provisioner.provision(&profile).await {
        Ok(user) => user,
        Err(e) => {
            // No local record, so the provider session must not outlive this request.
            if let Err(revoke_err) = state.identity.sign_out(&session.access_token).await {
                tracing::warn!(error = %revoke_err, "Failed to revoke provider session");
            }
            let msg = e.to_string();
            return (
                jar,
                Redirect::temporary(&login_error_url(frontend_url, "db", Some(&msg))),
            );
        }
    };

    let session_user = SessionUser::from(&profile);
    let jwt = match create_jwt(&session_user, &state.config.jwt_signing_key) {
        Ok(jwt) => jwt,
        Err(e) => {
            tracing::error!(error = %e, "JWT creation failed");
            return (jar, auth_failed);
        }
    };

    tracing::info!(uid = %user.uid, credits = user.credits, "Sign-in complete");

    let jar = session_cookies(
        jar,
        jwt,
        Some((session.access_token, session.expires_in)),
        secure,
    );
    (jar, Redirect::temporary(&landing_url(frontend_url)))
}

// ─── Session refresh / sign-out ─────────────────────────────

/// Identity as reported to the frontend.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub uid: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl From<&Identity> for SessionResponse {
    fn from(identity: &Identity) -> Self {
        let user = identity.user();
        Self {
            authenticated: user.is_some(),
            uid: user.map(|u| u.uid.clone()),
            email: user.and_then(|u| u.email.clone()),
            name: user.and_then(|u| u.name.clone()),
            avatar: user.and_then(|u| u.avatar.clone()),
        }
    }
}

/// Re-query the identity provider and reissue (or clear) the session.
async fn refresh_session(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionContext>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let secure = use_secure_cookies(&state.config.frontend_url);
    let identity = session.refresh(state.identity.as_ref()).await?;

    let jar = match &identity {
        Identity::Authenticated(user) => {
            let jwt = create_jwt(user, &state.config.jwt_signing_key)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;
            // Provider token cookie is left as is.
            session_cookies(jar, jwt, None, secure)
        }
        Identity::Anonymous => clear_session_cookies(jar, secure),
    };

    Ok((jar, Json(SessionResponse::from(&identity))))
}

/// Sign out: best-effort provider revocation, then drop the session cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionContext>>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    let uid = session.current().uid().map(str::to_string);
    session.sign_out(state.identity.as_ref()).await;

    tracing::info!(uid = ?uid, "Signed out");

    let secure = use_secure_cookies(&state.config.frontend_url);
    let jar = clear_nonce_cookie(clear_session_cookies(jar, secure), secure);
    (jar, StatusCode::NO_CONTENT)
}
