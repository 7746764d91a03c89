// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod identity;
pub mod oauth_state;
pub mod posts;
pub mod provisioning;
pub mod session;

pub use identity::{IdentityGateway, OidcGateway, ProviderSession};
pub use posts::PostRepository;
pub use provisioning::Provisioner;
pub use session::SessionContext;
