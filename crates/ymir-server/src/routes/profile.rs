//! Profile proxy to the DLAI resource API.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::error::{Result, ServerError};
use crate::session::CurrentSession;
use crate::state::AppState;

/// `GET /api/profile`
///
/// Forwards the session's DLAI bearer token to `{api_url}/user/profile`. Any
/// upstream 2xx becomes a `200` carrying the upstream body and `Content-Type`
/// unchanged (`application/json` when upstream sends none).
pub async fn profile_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response> {
    let session = session.ok_or_else(|| ServerError::Unauthorized("Not authenticated".to_string()))?;
    let token = session
        .user
        .dlai_jwt_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServerError::Unauthorized("No DLAI token".to_string()))?;

    let url = format!("{}/user/profile", state.config.api_url);
    debug!(user_id = %session.user.base.id, "Fetching DLAI profile");

    let response = state
        .http
        .get(&url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "DLAI API unreachable");
            ServerError::BadGateway(format!("DLAI API unreachable: {}", e.without_url()))
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ServerError::Upstream {
            status: status.as_u16(),
            message: format!("DLAI API error: {}", status.as_u16()),
        });
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    let body = response
        .bytes()
        .await
        .map_err(|e| {
            ServerError::BadGateway(format!(
                "Failed to read DLAI API response: {}",
                e.without_url()
            ))
        })?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response())
}
