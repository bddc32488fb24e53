//! OAuth 2.1 authorization-code flow with PKCE.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{OAuthError, Result};

/// Provider id used in the sign-in and callback paths.
pub const DEFAULT_PROVIDER_ID: &str = "dlai";

/// Scopes requested from the identity provider.
pub const DEFAULT_SCOPES: &[&str] = &["openid", "profile", "email"];

/// Client registration against a generic OIDC provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider id, e.g. `dlai`.
    pub provider_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Base URL of the auth server. Discovery lives under
    /// `{auth_url}/.well-known/openid-configuration`.
    pub auth_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    /// Create a provider config for the DLAI auth server.
    ///
    /// The redirect URI is derived from the application base URL.
    pub fn dlai(
        app_url: &str,
        auth_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let app_url = app_url.trim_end_matches('/');
        Self {
            provider_id: DEFAULT_PROVIDER_ID.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: auth_url.trim_end_matches('/').to_string(),
            redirect_uri: format!(
                "{}/api/auth/oauth2/callback/{}",
                app_url, DEFAULT_PROVIDER_ID
            ),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Space-separated scope string.
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    /// URL of the OIDC discovery document.
    pub fn discovery_url(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.auth_url)
    }
}

/// PKCE code verifier and challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair.
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let challenge = challenge_for(&verifier);

        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 challenge for a verifier.
pub fn challenge_for(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the authorization URL for the OAuth flow.
pub fn build_authorization_url(
    authorization_endpoint: &str,
    config: &ProviderConfig,
    challenge: &str,
    state: &str,
) -> String {
    let scope = config.scope();
    let params = [
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("scope", scope.as_str()),
        ("state", state),
        ("code_challenge", challenge),
        ("code_challenge_method", "S256"),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if authorization_endpoint.contains('?') {
        '&'
    } else {
        '?'
    };
    format!("{}{}{}", authorization_endpoint, separator, query)
}

/// Tokens returned from the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    redirect_uri: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    code_verifier: &'a str,
}

/// Exchange an authorization code for tokens at `token_endpoint`.
pub async fn exchange_code_for_tokens(
    client: &reqwest::Client,
    token_endpoint: &str,
    config: &ProviderConfig,
    code: &str,
    verifier: &str,
) -> Result<TokenResponse> {
    let request_body = TokenExchangeRequest {
        grant_type: "authorization_code",
        code,
        redirect_uri: &config.redirect_uri,
        client_id: &config.client_id,
        client_secret: &config.client_secret,
        code_verifier: verifier,
    };

    let response = client
        .post(token_endpoint)
        .header("Accept", "application/json")
        .form(&request_body)
        .send()
        .await
        .map_err(|e| OAuthError::Network(format!("Token exchange request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(OAuthError::Backend(format!(
            "Token exchange failed ({}): {}",
            status, error_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| OAuthError::Backend(format!("Failed to parse token response: {}", e)))
}
