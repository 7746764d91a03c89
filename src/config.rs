//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment (Cloud Run
//! secret bindings) and read once at startup.

use std::env;
use std::time::Duration;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 5;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Which [`crate::db::Datastore`] implementation backs the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatastoreKind {
    Firestore,
    Memory,
}

impl std::str::FromStr for DatastoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(DatastoreKind::Firestore),
            "memory" => Ok(DatastoreKind::Memory),
            _ => Err(ConfigError::Invalid("DATASTORE", s.to_string())),
        }
    }
}

/// OpenID Connect provider endpoints.
#[derive(Debug, Clone)]
pub struct OidcEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub revoke_url: String,
}

impl Default for OidcEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: GOOGLE_AUTHORIZE_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            revoke_url: GOOGLE_REVOKE_URL.to_string(),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// OIDC client ID (public)
    pub oidc_client_id: String,
    /// Identity provider endpoints
    pub oidc: OidcEndpoints,
    /// Frontend URL for post-login redirects
    pub frontend_url: String,
    /// Public URL of this API (OAuth callback base)
    pub api_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Datastore backend
    pub datastore: DatastoreKind,
    /// Upper bound on identity provider calls
    pub provider_timeout: Duration,
    /// Upper bound on datastore calls
    pub store_timeout: Duration,

    // --- Secrets ---
    /// OIDC client secret
    pub oidc_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth state parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Config for tests: memory datastore, localhost URLs, fixed keys.
    pub fn test_default() -> Self {
        Self {
            oidc_client_id: "test_client_id".to_string(),
            oidc: OidcEndpoints::default(),
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            datastore: DatastoreKind::Memory,
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            oidc_client_secret: "test_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key_32_bytes!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();
        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(String::into_bytes)
            .unwrap_or_else(|_| jwt_signing_key.clone());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let defaults = OidcEndpoints::default();

        Ok(Self {
            oidc_client_id: env::var("OIDC_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("OIDC_CLIENT_ID"))?,
            oidc: OidcEndpoints {
                authorize_url: env::var("OIDC_AUTHORIZE_URL").unwrap_or(defaults.authorize_url),
                token_url: env::var("OIDC_TOKEN_URL").unwrap_or(defaults.token_url),
                userinfo_url: env::var("OIDC_USERINFO_URL").unwrap_or(defaults.userinfo_url),
                revoke_url: env::var("OIDC_REVOKE_URL").unwrap_or(defaults.revoke_url),
            },
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| format!("http://localhost:{}", port)),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port,
            datastore: env::var("DATASTORE")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            provider_timeout: secs_from_env(
                "PROVIDER_TIMEOUT_SECS",
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            )?,
            store_timeout: secs_from_env("STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS)?,

            oidc_client_secret: env::var("OIDC_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("OIDC_CLIENT_SECRET"))?,
            jwt_signing_key,
            oauth_state_key,
        })
    }

    /// Callback URL registered with the identity provider.
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.api_url.trim_end_matches('/'))
    }
}

fn secs_from_env(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(name, raw.clone()))?;
            if secs == 0 {
                return Err(ConfigError::Invalid(name, raw));
            }
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
