//! Post-callback hook.
//!
//! The OAuth callback handler attaches the decoded identity claims to its own
//! response as a [`PendingClaims`] extension. This middleware runs after any
//! request whose path contains `/callback/`, persists the DLAI account fields
//! as the encrypted account cookie on that same response, and always strips
//! the extension. A callback whose claims carry no account data expires the
//! account cookie instead. Claims never outlive the request that produced them.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{CookieJar, PrivateCookieJar};
use ymir_oauth::{AccountData, IdentityClaims};

use crate::session::{ACCOUNT_COOKIE, account_cookie, expired_cookie};
use crate::state::AppState;

/// Claims parsed during token exchange, waiting to be persisted.
#[derive(Debug, Clone)]
pub struct PendingClaims(pub IdentityClaims);

/// Persist pending claims from OAuth callbacks as the account cookie.
pub async fn persist_claims_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let is_callback = request.uri().path().contains("/callback/");

    let mut response = next.run(request).await;
    let pending = response.extensions_mut().remove::<PendingClaims>();

    if !is_callback {
        return response;
    }
    let Some(PendingClaims(claims)) = pending else {
        return response;
    };

    let secure = state.config.secure_cookies;
    let account = AccountData::from_claims(&claims).and_then(|account| match account.to_json() {
        Ok(value) => Some((account, value)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to persist DLAI account data");
            None
        }
    });

    // A completed sign-in always replaces whatever account data the browser
    // still holds from an earlier login.
    match account {
        Some((account, value)) => {
            tracing::debug!(
                sub = %claims.sub,
                dlai_user_id = account.dlai_user_id,
                "Persisting DLAI account data"
            );
            let jar = PrivateCookieJar::new(state.cookie_key.clone())
                .add(account_cookie(value, secure));
            (jar, response).into_response()
        }
        None => {
            tracing::debug!(sub = %claims.sub, "Identity token carries no DLAI account data");
            let jar = CookieJar::new().add(expired_cookie(ACCOUNT_COOKIE, "/", secure));
            (jar, response).into_response()
        }
    }
}
