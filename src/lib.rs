// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Postboard: a shared feed of text posts behind third-party sign-in
//!
//! This crate provides the backend API: the sign-in callback that provisions
//! local users, and the post endpoints with per-author ownership.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Datastore;
use services::{IdentityGateway, PostRepository, Provisioner};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub identity: Arc<dyn IdentityGateway>,
    pub provisioner: Provisioner,
    pub posts: PostRepository,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn Datastore>, identity: Arc<dyn IdentityGateway>) -> Self {
        let provisioner = Provisioner::new(db.clone(), config.store_timeout);
        let posts = PostRepository::new(db, config.store_timeout);
        Self {
            config,
            identity,
            provisioner,
            posts,
        }
    }
}
