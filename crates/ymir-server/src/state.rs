//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use ymir_config::ResolvedConfig;
use ymir_oauth::{OAuthClient, ProviderConfig};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// OAuth client for the DLAI identity provider.
    pub oauth: Arc<OAuthClient>,

    /// HTTP client for the resource API.
    pub http: reqwest::Client,

    /// Key encrypting the session, account and OAuth state cookies.
    pub cookie_key: Key,
}

impl AppState {
    /// Create application state.
    ///
    /// The cookie key is derived from `session_secret`, which must not be empty.
    pub fn new(
        mut config: ServerConfig,
        provider: ProviderConfig,
        session_secret: &str,
    ) -> Result<Self> {
        if config.client_id.is_empty() {
            config.client_id = provider.client_id.clone();
        }
        let cookie_key = derive_cookie_key(session_secret)?;

        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|e| ServerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let oauth = OAuthClient::new(provider, http.clone());

        Ok(Self {
            config: Arc::new(config),
            oauth: Arc::new(oauth),
            http,
            cookie_key,
        })
    }

    /// Create application state from a validated configuration.
    pub fn from_resolved(resolved: &ResolvedConfig) -> Result<Self> {
        let provider = ProviderConfig::dlai(
            &resolved.app_url,
            &resolved.auth_url,
            resolved.client_id.clone(),
            resolved.client_secret.clone(),
        );
        Self::new(
            ServerConfig::from_resolved(resolved),
            provider,
            &resolved.session_secret,
        )
    }

    /// Get the server config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Derive the 64-byte cookie key from an arbitrary-length secret.
pub fn derive_cookie_key(secret: &str) -> Result<Key> {
    if secret.is_empty() {
        return Err(ServerError::Config("session secret is empty".to_string()));
    }
    if secret.len() < 32 {
        tracing::warn!("Session secret is shorter than 32 bytes; use a longer random value");
    }
    let digest = Sha512::digest(secret.as_bytes());
    Ok(Key::from(digest.as_slice()))
}
