//! OAuth sign-in, callback and session endpoints under `/api/auth`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{CookieJar, PrivateCookieJar};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use ymir_oauth::{IdentityClaims, OAuthError};

use crate::error::{Result, ServerError};
use crate::hooks::PendingClaims;
use crate::routes::logout::logout_handler;
use crate::session::{
    CurrentSession, OAUTH_STATE_COOKIE, OAUTH_STATE_PATH, Session, SessionData, expire_session_cookies,
    expired_cookie, oauth_state_cookie, session_cookie, sign_out,
};
use crate::state::AppState;

/// Error code shown to the browser for any failed login.
pub const LOGIN_FAILED: &str = "login_failed";

/// PKCE state carried between sign-in and callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthState {
    state: String,
    code_verifier: String,
}

/// Query parameters on the provider's redirect back to us.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Create the `/api/auth` routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sign-in/{provider}",
            get(sign_in_handler).post(sign_in_handler),
        )
        .route("/oauth2/callback/{provider}", get(callback_handler))
        .route("/get-session", get(get_session_handler))
        .route("/sign-out", post(sign_out_handler))
        .route("/logout", post(logout_handler))
}

fn check_provider(state: &AppState, provider: &str) -> Result<()> {
    if provider == state.oauth.config().provider_id {
        Ok(())
    } else {
        Err(ServerError::NotFound(format!("Unknown provider '{}'", provider)))
    }
}

/// Compare two strings in constant time.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}

/// `GET|POST /api/auth/sign-in/{provider}`: start the PKCE flow.
pub async fn sign_in_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
) -> Result<Response> {
    check_provider(&state, &provider)?;

    let request = state.oauth.authorization_request().await?;
    let pending = OAuthState {
        state: request.state,
        code_verifier: request.code_verifier,
    };
    let jar = jar.add(oauth_state_cookie(
        serde_json::to_string(&pending)?,
        state.config.secure_cookies,
    ));

    info!(provider = %provider, "Redirecting to identity provider");
    Ok((jar, Redirect::to(&request.url)).into_response())
}

/// `GET /api/auth/oauth2/callback/{provider}`: finish the PKCE flow.
///
/// On success the session cookie is set and the decoded claims are attached
/// to the response for the post-callback hook. Every failure redirects to the
/// page with a generic error and sets no session.
pub async fn callback_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let secure = state.config.secure_cookies;
    let clear_state = CookieJar::new().add(expired_cookie(OAUTH_STATE_COOKIE, OAUTH_STATE_PATH, secure));
    let app_url = &state.config.app_url;

    if let Some(error) = params.error.as_deref() {
        warn!(
            provider = %provider,
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Identity provider returned an error"
        );
        let target = format!("{}/?error={}", app_url, urlencoding::encode(error));
        return (clear_state, Redirect::to(&target)).into_response();
    }

    match complete_sign_in(&state, &provider, &jar, &params).await {
        Ok((data, claims)) => {
            let value = match serde_json::to_string(&data) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize session");
                    return login_failed(app_url, clear_state);
                }
            };
            info!(
                user_id = %data.user.id,
                session_id = %data.session.id,
                "Signed in"
            );
            let jar = jar.add(session_cookie(value, secure));
            let mut response =
                (jar, clear_state, Redirect::to(&format!("{}/", app_url))).into_response();
            response.extensions_mut().insert(PendingClaims(claims));
            response
        }
        Err(e) => {
            warn!(provider = %provider, error = %e, "Sign-in failed");
            login_failed(app_url, clear_state)
        }
    }
}

fn login_failed(app_url: &str, clear_state: CookieJar) -> Response {
    let target = format!("{}/?error={}", app_url, LOGIN_FAILED);
    (clear_state, Redirect::to(&target)).into_response()
}

async fn complete_sign_in(
    state: &AppState,
    provider: &str,
    jar: &PrivateCookieJar,
    params: &CallbackParams,
) -> Result<(SessionData, IdentityClaims)> {
    check_provider(state, provider)?;

    let stored = jar
        .get(OAUTH_STATE_COOKIE)
        .ok_or_else(|| ServerError::BadRequest("Missing OAuth state cookie".to_string()))?;
    let stored: OAuthState = serde_json::from_str(stored.value())
        .map_err(|_| ServerError::BadRequest("Malformed OAuth state cookie".to_string()))?;

    let returned = params.state.as_deref().unwrap_or_default();
    if !constant_time_eq(returned, &stored.state) {
        return Err(ServerError::BadRequest("OAuth state mismatch".to_string()));
    }

    let code = params
        .code
        .as_deref()
        .ok_or_else(|| OAuthError::InvalidRequest("Missing authorization code".to_string()))?;

    let (user, claims) = state.oauth.sign_in(code, &stored.code_verifier).await?;
    Ok((SessionData::new(user), claims))
}

/// `GET /api/auth/get-session`: the enriched session, or `null`.
pub async fn get_session_handler(CurrentSession(session): CurrentSession) -> Json<Option<Session>> {
    Json(session)
}

/// Response body of the local sign-out endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignOutResponse {
    pub success: bool,
}

/// `POST /api/auth/sign-out`: end the local session only.
pub async fn sign_out_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> impl IntoResponse {
    let outcome = sign_out(&jar);
    info!(?outcome, "Local sign-out");
    (
        expire_session_cookies(state.config.secure_cookies),
        Json(SignOutResponse { success: true }),
    )
}
