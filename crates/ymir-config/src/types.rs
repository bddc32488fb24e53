//! Configuration types.
//!
//! [`YmirConfig`] is the raw, layerable form read from TOML and environment;
//! every field is optional so layers can be merged. [`ResolvedConfig`] is the
//! validated form the server runs with.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ConfigError, Result};

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default DLAI resource API base URL.
pub const DEFAULT_API_URL: &str = "https://platform-api-dev.dlai.link";

/// Default timeout for calls to the identity provider and resource API.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Environment variable names.
pub mod env {
    pub const APP_URL: &str = "APP_URL";
    pub const AUTH_URL: &str = "AUTH_URL";
    pub const SESSION_SECRET: &str = "SESSION_SECRET";
    pub const CLIENT_ID: &str = "DLAI_OAUTH_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "DLAI_OAUTH_CLIENT_SECRET";
    pub const API_URL: &str = "DLAI_API_URL";
    pub const BIND: &str = "YMIR_BIND";
    pub const LOGOUT_STRATEGY: &str = "YMIR_LOGOUT_STRATEGY";
    pub const SECURE_COOKIES: &str = "YMIR_SECURE_COOKIES";
}

/// How the upstream identity provider session is ended at logout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoutStrategy {
    /// Send the browser to the provider's sign-out page with a `callbackURL`.
    #[default]
    SignOutPage,
    /// Send the browser to the OIDC end-session endpoint with `client_id`
    /// and `post_logout_redirect_uri`.
    EndSession,
}

impl FromStr for LogoutStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sign-out-page" | "sign-out" | "signout" => Ok(Self::SignOutPage),
            "end-session" | "oidc" => Ok(Self::EndSession),
            other => Err(ConfigError::Invalid {
                field: "auth.logout_strategy".to_string(),
                message: format!(
                    "unknown strategy '{}', expected 'sign-out-page' or 'end-session'",
                    other
                ),
            }),
        }
    }
}

impl fmt::Display for LogoutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogoutStrategy::SignOutPage => write!(f, "sign-out-page"),
            LogoutStrategy::EndSession => write!(f, "end-session"),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: Option<String>,
    /// Mark cookies `Secure`. Defaults to true when `app_url` is https.
    pub secure_cookies: Option<bool>,
    pub request_logging: Option<bool>,
    pub upstream_timeout_secs: Option<u64>,
}

/// `[auth]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthSection {
    /// Public base URL of this application.
    pub app_url: Option<String>,
    /// Base URL of the DLAI auth server.
    pub auth_url: Option<String>,
    pub session_secret: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub logout_strategy: Option<LogoutStrategy>,
}

/// `[api]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    /// Base URL of the DLAI resource API.
    pub base_url: Option<String>,
}

/// Layerable configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YmirConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub api: ApiSection,
}

fn overlay<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

impl YmirConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: YmirConfig) {
        overlay(&mut self.server.bind, other.server.bind);
        overlay(&mut self.server.secure_cookies, other.server.secure_cookies);
        overlay(&mut self.server.request_logging, other.server.request_logging);
        overlay(
            &mut self.server.upstream_timeout_secs,
            other.server.upstream_timeout_secs,
        );

        overlay(&mut self.auth.app_url, other.auth.app_url);
        overlay(&mut self.auth.auth_url, other.auth.auth_url);
        overlay(&mut self.auth.session_secret, other.auth.session_secret);
        overlay(&mut self.auth.client_id, other.auth.client_id);
        overlay(&mut self.auth.client_secret, other.auth.client_secret);
        overlay(&mut self.auth.logout_strategy, other.auth.logout_strategy);

        overlay(&mut self.api.base_url, other.api.base_url);
    }

    /// Build a layer from environment variables using `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let logout_strategy = get(env::LOGOUT_STRATEGY)
            .map(|v| v.parse::<LogoutStrategy>())
            .transpose()?;
        let secure_cookies = get(env::SECURE_COOKIES)
            .map(|v| parse_bool(env::SECURE_COOKIES, &v))
            .transpose()?;

        Ok(Self {
            server: ServerSection {
                bind: get(env::BIND),
                secure_cookies,
                ..Default::default()
            },
            auth: AuthSection {
                app_url: get(env::APP_URL),
                auth_url: get(env::AUTH_URL),
                session_secret: get(env::SESSION_SECRET),
                client_id: get(env::CLIENT_ID),
                client_secret: get(env::CLIENT_SECRET),
                logout_strategy,
            },
            api: ApiSection {
                base_url: get(env::API_URL),
            },
        })
    }

    /// Build a layer from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Validate and apply defaults.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let app_url = require(&self.auth.app_url, "app_url", "[auth]", env::APP_URL)?;
        let auth_url = require(&self.auth.auth_url, "auth_url", "[auth]", env::AUTH_URL)?;
        let session_secret = require(
            &self.auth.session_secret,
            "session_secret",
            "[auth]",
            env::SESSION_SECRET,
        )?;
        let client_id = require(&self.auth.client_id, "client_id", "[auth]", env::CLIENT_ID)?;
        let client_secret = require(
            &self.auth.client_secret,
            "client_secret",
            "[auth]",
            env::CLIENT_SECRET,
        )?;

        let parsed_app_url = check_url("auth.app_url", &app_url)?;
        check_url("auth.auth_url", &auth_url)?;

        let api_url = self
            .api
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        check_url("api.base_url", &api_url)?;

        let bind_str = self.server.bind.as_deref().unwrap_or(DEFAULT_BIND);
        let bind_address: SocketAddr = bind_str.parse().map_err(|e| ConfigError::Invalid {
            field: "server.bind".to_string(),
            message: format!("'{}': {}", bind_str, e),
        })?;

        let secure_cookies = self
            .server
            .secure_cookies
            .unwrap_or_else(|| parsed_app_url.scheme() == "https");

        Ok(ResolvedConfig {
            bind_address,
            secure_cookies,
            request_logging: self.server.request_logging.unwrap_or(true),
            upstream_timeout: Duration::from_secs(
                self.server
                    .upstream_timeout_secs
                    .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            ),
            app_url: trim_url(&app_url),
            auth_url: trim_url(&auth_url),
            session_secret,
            client_id,
            client_secret,
            logout_strategy: self.auth.logout_strategy.unwrap_or_default(),
            api_url: trim_url(&api_url),
        })
    }
}

fn require(value: &Option<String>, field: &str, context: &str, env_var: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingField {
            field: field.to_string(),
            context: context.to_string(),
            env_var: env_var.to_string(),
        })
}

fn check_url(field: &str, value: &str) -> Result<Url> {
    let invalid = |message: String| ConfigError::Invalid {
        field: field.to_string(),
        message: format!("'{}': {}", value, message),
    };
    let parsed = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(parsed)
}

fn trim_url(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            field: field.to_string(),
            message: format!("'{}' is not a boolean", value),
        }),
    }
}

/// Validated configuration.
#[derive(Clone, PartialEq)]
pub struct ResolvedConfig {
    pub bind_address: SocketAddr,
    pub secure_cookies: bool,
    pub request_logging: bool,
    pub upstream_timeout: Duration,
    /// Public base URL of this application, without trailing slash.
    pub app_url: String,
    /// Base URL of the auth server, without trailing slash.
    pub auth_url: String,
    pub session_secret: String,
    pub client_id: String,
    pub client_secret: String,
    pub logout_strategy: LogoutStrategy,
    /// Base URL of the resource API, without trailing slash.
    pub api_url: String,
}

// Secrets never reach logs through Debug.
impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("bind_address", &self.bind_address)
            .field("secure_cookies", &self.secure_cookies)
            .field("request_logging", &self.request_logging)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("app_url", &self.app_url)
            .field("auth_url", &self.auth_url)
            .field("session_secret", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("logout_strategy", &self.logout_strategy)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl fmt::Display for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bind_address     = {}", self.bind_address)?;
        writeln!(f, "secure_cookies   = {}", self.secure_cookies)?;
        writeln!(f, "request_logging  = {}", self.request_logging)?;
        writeln!(f, "upstream_timeout = {}s", self.upstream_timeout.as_secs())?;
        writeln!(f, "app_url          = {}", self.app_url)?;
        writeln!(f, "auth_url         = {}", self.auth_url)?;
        writeln!(f, "session_secret   = <redacted>")?;
        writeln!(f, "client_id        = {}", self.client_id)?;
        writeln!(f, "client_secret    = <redacted>")?;
        writeln!(f, "logout_strategy  = {}", self.logout_strategy)?;
        write!(f, "api_url          = {}", self.api_url)
    }
}
