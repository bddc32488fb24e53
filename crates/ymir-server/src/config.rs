//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use ymir_config::{DEFAULT_UPSTREAM_TIMEOUT_SECS, LogoutStrategy, ResolvedConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Public base URL of this application, without trailing slash.
    pub app_url: String,

    /// Base URL of the DLAI auth server, without trailing slash.
    pub auth_url: String,

    /// Base URL of the DLAI resource API, without trailing slash.
    pub api_url: String,

    /// OAuth client id, sent to the end-session endpoint.
    pub client_id: String,

    /// How logout ends the upstream session.
    pub logout_strategy: LogoutStrategy,

    /// Mark cookies `Secure`.
    pub secure_cookies: bool,

    /// Enable request logging.
    pub request_logging: bool,

    /// Timeout for calls to the identity provider and resource API.
    pub upstream_timeout: Duration,
}

impl ServerConfig {
    /// Create a config for the given application, auth server and resource API URLs.
    pub fn new(
        app_url: impl Into<String>,
        auth_url: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        let app_url = trim(app_url.into());
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            secure_cookies: app_url.starts_with("https://"),
            app_url,
            auth_url: trim(auth_url.into()),
            api_url: trim(api_url.into()),
            client_id: String::new(),
            logout_strategy: LogoutStrategy::default(),
            request_logging: true,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }

    /// Build from a validated configuration.
    pub fn from_resolved(resolved: &ResolvedConfig) -> Self {
        Self {
            bind_address: resolved.bind_address,
            app_url: resolved.app_url.clone(),
            auth_url: resolved.auth_url.clone(),
            api_url: resolved.api_url.clone(),
            client_id: resolved.client_id.clone(),
            logout_strategy: resolved.logout_strategy,
            secure_cookies: resolved.secure_cookies,
            request_logging: resolved.request_logging,
            upstream_timeout: resolved.upstream_timeout,
        }
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the OAuth client id.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the logout strategy.
    pub fn with_logout_strategy(mut self, strategy: LogoutStrategy) -> Self {
        self.logout_strategy = strategy;
        self
    }

    /// Enable or disable `Secure` cookies.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Set the upstream request timeout.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}

fn trim(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
