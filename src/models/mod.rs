// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod identity;
pub mod post;
pub mod user;

pub use identity::{Identity, Profile, SessionUser};
pub use post::{Post, PostInput, MAX_CONTENT_CHARS, MAX_TITLE_CHARS};
pub use user::{User, DEFAULT_CREDITS};
