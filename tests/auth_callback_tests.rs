// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in completion tests.
//!
//! Drive `/auth/callback` through the router with a scripted identity
//! provider and check where the browser ends up, which cookies it gets, and
//! what was written to the datastore.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use postboard::db::Datastore;
use postboard::error::AuthError;
use postboard::middleware::auth::decode_session;
use postboard::config::Config;
use std::sync::Arc;
use tower::ServiceExt;

mod common;
use common::{create_test_app, location, set_cookies, signed_state_and_cookie};

fn callback(query: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/auth/callback{query}"));
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    cookies
        .iter()
        .find(|c| c.starts_with(&format!("{name}=")))
        .map(|c| {
            c[name.len() + 1..]
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

#[tokio::test]
async fn test_missing_code_goes_to_landing_without_provider() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(callback("", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "http://localhost:5173/dashboard");
    assert_eq!(app.gateway.exchanges(), 0);
    assert_eq!(app.gateway.profiles(), 0);
    assert_eq!(app.store.user_count().await, 0);
}

#[tokio::test]
async fn test_empty_code_goes_to_landing_without_provider() {
    let app = create_test_app();
    let (state, nonce_cookie) = signed_state_and_cookie();

    let response = app
        .router
        .oneshot(callback(&format!("?code=&state={state}"), Some(nonce_cookie.as_str())))
        .await
        .unwrap();

    assert_eq!(location(&response), "http://localhost:5173/dashboard");
    assert_eq!(app.gateway.exchanges(), 0);
}

#[tokio::test]
async fn test_failed_exchange_never_provisions() {
    let app = create_test_app();
    app.gateway
        .set_exchange(Err(AuthError::ExchangeFailed("invalid_grant".to_string())));
    let (state, nonce_cookie) = signed_state_and_cookie();

    let response = app
        .router
        .oneshot(callback(
            &format!("?code=bad-code&state={state}"),
            Some(nonce_cookie.as_str()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "http://localhost:5173/login?error=auth");
    assert_eq!(app.gateway.exchanges(), 1);
    assert_eq!(app.gateway.profiles(), 0);
    assert_eq!(app.store.user_count().await, 0);

    let cookies = set_cookies(&response);
    assert!(cookie_value(&cookies, "postboard_session").is_none());
}

#[tokio::test]
async fn test_provider_error_without_code_goes_to_landing() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(callback("?error=access_denied", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "http://localhost:5173/dashboard");
    assert_eq!(app.gateway.exchanges(), 0);
    assert_eq!(app.store.user_count().await, 0);
}

#[tokio::test]
async fn test_provider_error_with_code_is_auth_failure() {
    let app = create_test_app();
    let (state, nonce_cookie) = signed_state_and_cookie();

    let response = app
        .router
        .oneshot(callback(
            &format!("?code=abc&error=access_denied&state={state}"),
            Some(nonce_cookie.as_str()),
        ))
        .await
        .unwrap();

    assert_eq!(location(&response), "http://localhost:5173/login?error=auth");
    assert_eq!(app.gateway.exchanges(), 0);
}

#[tokio::test]
async fn test_state_without_nonce_cookie_is_rejected() {
    let app = create_test_app();
    let (state, _) = signed_state_and_cookie();

    let response = app
        .router
        .oneshot(callback(&format!("?code=abc&state={state}"), None))
        .await
        .unwrap();

    assert_eq!(location(&response), "http://localhost:5173/login?error=auth");
    assert_eq!(app.gateway.exchanges(), 0);
}

#[tokio::test]
async fn test_state_bound_to_other_browser_is_rejected() {
    let app = create_test_app();
    let (state, _) = signed_state_and_cookie();

    let response = app
        .router
        .oneshot(callback(
            &format!("?code=abc&state={state}"),
            Some("postboard_oauth_nonce=someone-elses-nonce"),
        ))
        .await
        .unwrap();

    assert_eq!(location(&response), "http://localhost:5173/login?error=auth");
    assert_eq!(app.gateway.exchanges(), 0);
}

#[tokio::test]
async fn test_missing_profile_is_auth_failure() {
    let app = create_test_app();
    app.gateway.set_profile(Ok(None));
    let (state, nonce_cookie) = signed_state_and_cookie();

    let response = app
        .router
        .oneshot(callback(&format!("?code=abc&state={state}"), Some(nonce_cookie.as_str())))
        .await
        .unwrap();

    assert_eq!(location(&response), "http://localhost:5173/login?error=auth");
    assert_eq!(app.store.user_count().await, 0);
}

#[tokio::test]
async fn test_success_provisions_and_sets_session() {
    let app = create_test_app();
    let (state, nonce_cookie) = signed_state_and_cookie();

    let response = app
        .router
        .oneshot(callback(&format!("?code=abc&state={state}"), Some(nonce_cookie.as_str())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "http://localhost:5173/dashboard");

    let user = app.store.get_user("alice").await.unwrap().unwrap();
    assert_eq!(user.credits, 3);
    assert_eq!(user.email.as_deref(), Some("alice@example.com"));

    let cookies = set_cookies(&response);
    let jwt = cookie_value(&cookies, "postboard_session").expect("session cookie");
    let session = decode_session(&jwt, &Config::test_default().jwt_signing_key).unwrap();
    assert_eq!(session.uid, "alice");
    assert_eq!(session.name.as_deref(), Some("User alice"));

    assert_eq!(
        cookie_value(&cookies, "postboard_provider_token").as_deref(),
        Some("provider-access-token")
    );

    let session_cookie = cookies
        .iter()
        .find(|c| c.starts_with("postboard_session="))
        .unwrap();
    assert!(session_cookie.contains("HttpOnly"));
    assert!(session_cookie.contains("SameSite=Lax"));
    assert!(session_cookie.contains("Path=/"));
    assert!(!session_cookie.contains("Secure"));

    // The one-shot nonce is consumed.
    let nonce = cookies
        .iter()
        .find(|c| c.starts_with("postboard_oauth_nonce="))
        .expect("nonce removal");
    assert!(nonce.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_repeat_sign_in_keeps_credits() {
    let app = create_test_app();

    for _ in 0..2 {
        let (state, nonce_cookie) = signed_state_and_cookie();
        let response = app
            .router
            .clone()
            .oneshot(callback(&format!("?code=abc&state={state}"), Some(nonce_cookie.as_str())))
            .await
            .unwrap();
        assert_eq!(location(&response), "http://localhost:5173/dashboard");
    }

    assert_eq!(app.store.user_count().await, 1);
    assert_eq!(
        app.store.get_user("alice").await.unwrap().unwrap().credits,
        3
    );
}

#[tokio::test]
async fn test_store_failure_redirects_with_db_error_and_revokes() {
    let (router, gateway) =
        common::create_test_app_with_store(Arc::new(common::test_db_offline()));
    let (state, nonce_cookie) = signed_state_and_cookie();

    let response = router
        .oneshot(callback(&format!("?code=abc&state={state}"), Some(nonce_cookie.as_str())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let target = location(&response);
    assert!(
        target.starts_with("http://localhost:5173/login?error=db&msg="),
        "unexpected redirect: {target}"
    );
    assert!(target.contains("offline%20mode"));

    // No session is established and the provider session is revoked.
    let cookies = set_cookies(&response);
    assert!(cookie_value(&cookies, "postboard_session").is_none());
    assert_eq!(gateway.sign_outs(), 1);
    assert_eq!(
        gateway.revoked_tokens.lock().unwrap().as_slice(),
        ["provider-access-token".to_string()]
    );
}

#[tokio::test]
async fn test_login_sets_nonce_and_redirects_to_provider() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/auth/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).starts_with("https://idp.example.com/authorize?state="));

    let cookies = set_cookies(&response);
    let nonce = cookies
        .iter()
        .find(|c| c.starts_with("postboard_oauth_nonce="))
        .expect("nonce cookie");
    assert!(nonce.contains("Path=/auth/callback"));
    assert!(nonce.contains("HttpOnly"));
}
