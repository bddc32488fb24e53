//! OAuth 2.1 + PKCE client for the Ymir (DLAI) identity provider.
//!
//! # Components
//!
//! - [`discovery`]: OIDC discovery document
//! - [`oauth`]: PKCE challenge, authorization URL, code exchange
//! - [`claims`]: identity token decoding and the DLAI account fields
//! - [`client`]: provider-bound client caching discovery

pub mod claims;
pub mod client;
pub mod discovery;
pub mod error;
pub mod oauth;

pub use claims::{AccountData, IdentityClaims, UserInfo, decode_id_token};
pub use client::{AuthorizationRequest, OAuthClient};
pub use discovery::ProviderMetadata;
pub use error::{OAuthError, Result};
pub use oauth::{PkceChallenge, ProviderConfig, TokenResponse};
