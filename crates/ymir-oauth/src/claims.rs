//! Identity token claims.
//!
//! The id token is decoded, not verified: it arrives directly from the token
//! endpoint over TLS in the same exchange that authenticated the client.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};

/// Claims carried by a DLAI identity token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    /// Bearer token for the DLAI resource API.
    #[serde(default)]
    pub dlai_jwt_token: Option<String>,
    #[serde(default)]
    pub dlai_user_id: Option<i64>,
    #[serde(default)]
    pub dlai_user_hash: Option<String>,
}

/// Decode the payload segment of a JWT into [`IdentityClaims`].
pub fn decode_id_token(id_token: &str) -> Result<IdentityClaims> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(header), Some(payload)) if !header.is_empty() && !payload.is_empty() => payload,
        _ => {
            return Err(OAuthError::InvalidIdToken(
                "expected header.payload.signature".to_string(),
            ));
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| OAuthError::InvalidIdToken(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| OAuthError::InvalidIdToken(format!("payload is not a claims object: {}", e)))
}

/// The user record created from a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub email_verified: bool,
}

impl From<&IdentityClaims> for UserInfo {
    fn from(claims: &IdentityClaims) -> Self {
        Self {
            id: claims.sub.clone(),
            email: claims.email.clone().unwrap_or_default(),
            name: claims.name.clone(),
            image: claims.picture.clone(),
            email_verified: true,
        }
    }
}

/// DLAI account fields persisted next to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    pub dlai_jwt_token: String,
    pub dlai_user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dlai_user_hash: Option<String>,
}

impl AccountData {
    /// Extract account data from claims.
    ///
    /// Returns `None` unless both the bearer token and a non-zero user id are present.
    pub fn from_claims(claims: &IdentityClaims) -> Option<Self> {
        let token = claims.dlai_jwt_token.as_deref().filter(|t| !t.is_empty())?;
        let user_id = claims.dlai_user_id.filter(|id| *id != 0)?;

        Some(Self {
            dlai_jwt_token: token.to_string(),
            dlai_user_id: user_id,
            dlai_user_hash: claims.dlai_user_hash.clone(),
        })
    }

    /// Parse a stored cookie value. Malformed data yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match serde_json::from_str(value) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed account data");
                None
            }
        }
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| OAuthError::InvalidRequest(format!("Failed to serialize account data: {}", e)))
    }
}
