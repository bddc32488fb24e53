//! OAuth client bound to one identity provider.

use tokio::sync::OnceCell;

use crate::claims::{IdentityClaims, UserInfo, decode_id_token};
use crate::discovery::{ProviderMetadata, discover};
use crate::error::{OAuthError, Result};
use crate::oauth::{
    PkceChallenge, ProviderConfig, TokenResponse, build_authorization_url,
    exchange_code_for_tokens, generate_state,
};

/// A pending authorization: where to send the browser and what to remember.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

/// OAuth client with a lazily discovered, cached provider document.
#[derive(Debug)]
pub struct OAuthClient {
    config: ProviderConfig,
    http: reqwest::Client,
    metadata: OnceCell<ProviderMetadata>,
}

impl OAuthClient {
    pub fn new(config: ProviderConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            metadata: OnceCell::new(),
        }
    }

    /// Create a client with already known provider metadata (skips discovery).
    pub fn with_metadata(
        config: ProviderConfig,
        http: reqwest::Client,
        metadata: ProviderMetadata,
    ) -> Self {
        Self {
            config,
            http,
            metadata: OnceCell::new_with(Some(metadata)),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Provider metadata, fetched on first use. Failures are not cached.
    pub async fn metadata(&self) -> Result<&ProviderMetadata> {
        self.metadata
            .get_or_try_init(|| async {
                let metadata = discover(&self.http, &self.config.discovery_url()).await?;
                tracing::info!(issuer = %metadata.issuer, "Discovered identity provider");
                Ok::<_, OAuthError>(metadata)
            })
            .await
    }

    /// Metadata if discovery already succeeded.
    pub fn cached_metadata(&self) -> Option<&ProviderMetadata> {
        self.metadata.get()
    }

    /// Start a PKCE authorization.
    pub async fn authorization_request(&self) -> Result<AuthorizationRequest> {
        let metadata = self.metadata().await?;
        let pkce = PkceChallenge::generate();
        let state = generate_state();
        let url = build_authorization_url(
            &metadata.authorization_endpoint,
            &self.config,
            &pkce.challenge,
            &state,
        );

        Ok(AuthorizationRequest {
            url,
            state,
            code_verifier: pkce.verifier,
        })
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenResponse> {
        if code.is_empty() {
            return Err(OAuthError::InvalidRequest(
                "Missing authorization code".to_string(),
            ));
        }
        let metadata = self.metadata().await?;
        exchange_code_for_tokens(
            &self.http,
            &metadata.token_endpoint,
            &self.config,
            code,
            code_verifier,
        )
        .await
    }

    /// Build the user from the identity token in `tokens`.
    ///
    /// Fails with [`OAuthError::MissingIdToken`] when the provider did not
    /// return one, which aborts the login.
    pub fn get_user_info(&self, tokens: &TokenResponse) -> Result<(UserInfo, IdentityClaims)> {
        let id_token = tokens.id_token.as_deref().ok_or(OAuthError::MissingIdToken)?;
        let claims = decode_id_token(id_token)?;
        if claims.sub.is_empty() {
            return Err(OAuthError::InvalidIdToken("empty sub claim".to_string()));
        }
        Ok((UserInfo::from(&claims), claims))
    }

    /// Exchange the code and build the user in one step.
    pub async fn sign_in(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<(UserInfo, IdentityClaims)> {
        let tokens = self.exchange_code(code, code_verifier).await?;
        self.get_user_info(&tokens)
    }
}
