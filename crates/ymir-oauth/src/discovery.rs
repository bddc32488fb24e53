//! OIDC provider discovery via the `.well-known` endpoint.

use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};

/// The subset of the OIDC discovery document this client uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

/// Fetch and parse the discovery document at `discovery_url`.
pub async fn discover(client: &reqwest::Client, discovery_url: &str) -> Result<ProviderMetadata> {
    tracing::debug!(url = %discovery_url, "Fetching OIDC discovery document");

    let response = client
        .get(discovery_url)
        .send()
        .await
        .map_err(|e| OAuthError::Discovery(format!("HTTP error: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(OAuthError::Discovery(format!(
            "{} returned {}",
            discovery_url, status
        )));
    }

    response
        .json()
        .await
        .map_err(|e| OAuthError::Discovery(format!("JSON parse error: {}", e)))
}
