//! Error types for the OAuth client.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while talking to the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Identity provider returned an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// OIDC discovery document could not be fetched or parsed.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Token response did not carry an `id_token`.
    #[error("Missing id_token in OAuth response")]
    MissingIdToken,

    /// Identity token could not be decoded.
    #[error("Invalid id_token: {0}")]
    InvalidIdToken(String),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
