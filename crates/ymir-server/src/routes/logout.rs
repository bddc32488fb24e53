//! Logout against the local session and the upstream identity provider.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ymir_config::LogoutStrategy;

use crate::config::ServerConfig;
use crate::session::{SignOutOutcome, expire_session_cookies, sign_out};
use crate::state::AppState;

/// JSON body returned to script callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub success: bool,
    pub redirect_url: String,
}

/// Build the URL the browser should visit to end the upstream session.
///
/// `end_session_endpoint` is the value advertised by the provider's discovery
/// document, if known.
pub fn upstream_logout_url(config: &ServerConfig, end_session_endpoint: Option<&str>) -> String {
    match config.logout_strategy {
        LogoutStrategy::SignOutPage => format!(
            "{}/sign-out?callbackURL={}",
            config.auth_url,
            urlencoding::encode(&config.app_url)
        ),
        LogoutStrategy::EndSession => {
            let endpoint = end_session_endpoint
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}/api/auth/oauth2/end-session", config.auth_url));
            let separator = if endpoint.contains('?') { '&' } else { '?' };
            format!(
                "{}{}client_id={}&post_logout_redirect_uri={}",
                endpoint,
                separator,
                urlencoding::encode(&config.client_id),
                urlencoding::encode(&config.app_url)
            )
        }
    }
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

/// `POST /api/auth/logout`
///
/// Signs out locally (best effort), expires the session and account cookies
/// on every path, and hands the browser the upstream logout URL.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
) -> Response {
    match sign_out(&jar) {
        SignOutOutcome::SignedOut {
            session_id,
            user_id,
        } => info!(%session_id, %user_id, "Signed out local session"),
        SignOutOutcome::Failed { reason } => {
            warn!(%reason, "Local sign-out failed; continuing with upstream logout")
        }
    }

    let config = state.config();
    let end_session_endpoint = match config.logout_strategy {
        LogoutStrategy::EndSession => match state.oauth.metadata().await {
            Ok(metadata) => metadata.end_session_endpoint.clone(),
            Err(e) => {
                debug!(error = %e, "Discovery unavailable; using default end-session endpoint");
                None
            }
        },
        LogoutStrategy::SignOutPage => None,
    };
    let redirect_url = upstream_logout_url(config, end_session_endpoint.as_deref());

    let cookies = expire_session_cookies(config.secure_cookies);
    if wants_json(&headers) {
        (
            cookies,
            Json(LogoutResponse {
                success: true,
                redirect_url,
            }),
        )
            .into_response()
    } else {
        (cookies, Redirect::to(&redirect_url)).into_response()
    }
}
