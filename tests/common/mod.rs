// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::http::Response;
use postboard::config::Config;
use postboard::db::{Datastore, FirestoreDb, MemoryStore, StoreError};
use postboard::error::AuthError;
use postboard::middleware::auth::create_jwt;
use postboard::models::{Post, PostInput, Profile, SessionUser, User};
use postboard::routes::create_router;
use postboard::services::oauth_state::{now_millis, sign_state};
use postboard::services::{IdentityGateway, ProviderSession};
use postboard::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

#[allow(dead_code)]
pub fn profile(uid: &str) -> Profile {
    Profile {
        external_id: uid.to_string(),
        email: Some(format!("{uid}@example.com")),
        display_name: Some(format!("User {uid}")),
        avatar_url: Some(format!("https://example.com/{uid}.png")),
    }
}

#[allow(dead_code)]
pub fn session_user(uid: &str) -> SessionUser {
    SessionUser::from(&profile(uid))
}

// ─── Identity provider fake ─────────────────────────────────

/// Scripted [`IdentityGateway`] that counts every call.
#[allow(dead_code)]
pub struct FakeGateway {
    pub exchange_result: Mutex<Result<ProviderSession, AuthError>>,
    pub profile_result: Mutex<Result<Option<Profile>, AuthError>>,
    pub sign_out_result: Mutex<Result<(), AuthError>>,
    pub exchange_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub revoked_tokens: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeGateway {
    /// A provider that signs everyone in as `profile`.
    pub fn signing_in(profile: Profile) -> Self {
        Self {
            exchange_result: Mutex::new(Ok(ProviderSession {
                access_token: "provider-access-token".to_string(),
                expires_in: Some(3600),
            })),
            profile_result: Mutex::new(Ok(Some(profile))),
            sign_out_result: Mutex::new(Ok(())),
            exchange_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            revoked_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn set_exchange(&self, result: Result<ProviderSession, AuthError>) {
        *self.exchange_result.lock().unwrap() = result;
    }

    pub fn set_profile(&self, result: Result<Option<Profile>, AuthError>) {
        *self.profile_result.lock().unwrap() = result;
    }

    pub fn set_sign_out(&self, result: Result<(), AuthError>) {
        *self.sign_out_result.lock().unwrap() = result;
    }

    pub fn exchanges(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn profiles(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityGateway for FakeGateway {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "https://idp.example.com/authorize?state={}",
            urlencoding::encode(state)
        )
    }

    async fn exchange_code_for_session(&self, _code: &str) -> Result<ProviderSession, AuthError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange_result.lock().unwrap().clone()
    }

    async fn current_profile(&self, _access_token: &str) -> Result<Option<Profile>, AuthError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profile_result.lock().unwrap().clone()
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.revoked_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());
        self.sign_out_result.lock().unwrap().clone()
    }
}

// ─── Datastore wrappers ─────────────────────────────────────

/// Delays every call to an inner store.
#[allow(dead_code)]
pub struct SlowStore<S> {
    pub inner: S,
    pub delay: Duration,
}

#[async_trait]
impl<S: Datastore> Datastore for SlowStore<S> {
    async fn upsert_user(&self, user: &User) -> Result<User, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert_user(user).await
    }

    async fn get_user(&self, uid: &str) -> Result<Option<User>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_user(uid).await
    }

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert_post(post).await
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_post(id).await
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_posts().await
    }

    async fn update_post(
        &self,
        id: &str,
        requester_uid: &str,
        changes: &PostInput,
    ) -> Result<Post, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.update_post(id, requester_uid, changes).await
    }

    async fn delete_post(&self, id: &str, requester_uid: &str) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_post(id, requester_uid).await
    }
}

// ─── App builders ───────────────────────────────────────────

/// Everything a router-level test needs to poke at.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: MemoryStore,
    pub gateway: Arc<FakeGateway>,
}

/// Create a test app backed by a memory store and a provider that signs
/// everyone in as `alice`.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let store = MemoryStore::new();
    let gateway = Arc::new(FakeGateway::signing_in(profile("alice")));
    let state = Arc::new(AppState::new(
        config,
        Arc::new(store.clone()),
        gateway.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        gateway,
    }
}

/// Create a test app over an arbitrary datastore.
#[allow(dead_code)]
pub fn create_test_app_with_store(db: Arc<dyn Datastore>) -> (axum::Router, Arc<FakeGateway>) {
    let gateway = Arc::new(FakeGateway::signing_in(profile("alice")));
    let state = Arc::new(AppState::new(Config::test_default(), db, gateway.clone()));
    (create_router(state), gateway)
}

// ─── Request helpers ────────────────────────────────────────

/// Session JWT for `uid`, signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str) -> String {
    create_jwt(&session_user(uid), &Config::test_default().jwt_signing_key).unwrap()
}

/// Cookie header for a session belonging to `uid`.
#[allow(dead_code)]
pub fn session_cookie(uid: &str) -> String {
    format!("postboard_session={}", create_test_jwt(uid))
}

/// A fresh signed state and the nonce cookie that binds it.
#[allow(dead_code)]
pub fn signed_state_and_cookie() -> (String, String) {
    let nonce = "test-nonce-0123456789";
    let state = sign_state(
        nonce,
        now_millis().unwrap(),
        &Config::test_default().oauth_state_key,
    )
    .unwrap();
    (state, format!("postboard_oauth_nonce={nonce}"))
}

/// All `Set-Cookie` header values on a response.
#[allow(dead_code)]
pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// `Location` header of a redirect.
#[allow(dead_code)]
pub fn location<B>(response: &Response<B>) -> String {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
