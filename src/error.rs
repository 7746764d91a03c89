// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the identity, provisioning and post layers, and their
//! conversion into consistent API responses.

use crate::db::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Identity provider failures (transport errors and timeouts included).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Identity lookup failed: {0}")]
    LookupFailed(String),
}

/// User provisioning failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionError {
    #[error("Datastore unavailable: {0}")]
    StoreUnavailable(String),
}

/// Post repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid post: {0}")]
    InvalidInput(String),

    #[error("Only the author may modify this post")]
    Forbidden,

    #[error("Post not found")]
    NotFound,

    #[error("Datastore unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for PostError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PostError::NotFound,
            StoreError::OwnershipMismatch => PostError::Forbidden,
            StoreError::Unavailable(msg) => PostError::StoreUnavailable(msg),
        }
    }
}

impl From<StoreError> for ProvisionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ProvisionError::StoreUnavailable(msg),
            other => ProvisionError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Datastore unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::Unauthenticated => AppError::Unauthorized,
            PostError::InvalidInput(msg) => AppError::BadRequest(msg),
            PostError::Forbidden => AppError::Forbidden,
            PostError::NotFound => AppError::NotFound("post".to_string()),
            PostError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::IdentityProvider(err.to_string())
    }
}

impl From<ProvisionError> for AppError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
        }
    }
}

/// Malformed or incomplete request bodies use the same 400 as failed validation.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        PostError::from(err).into()
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_input", Some(msg.clone()))
            }
            AppError::IdentityProvider(msg) => {
                tracing::warn!(error = %msg, "Identity provider error");
                (StatusCode::BAD_GATEWAY, "identity_provider_error", None)
            }
            AppError::StoreUnavailable(msg) => {
                tracing::error!(error = %msg, "Datastore error");
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
