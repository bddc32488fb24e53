//! Cookie-backed sessions.
//!
//! Three encrypted cookies are involved:
//!
//! - `ymir.session_token`: the base session (user + session metadata)
//! - `dlai_account_data`: the DLAI account fields from the identity token
//! - `ymir.oauth_state`: PKCE verifier and state between sign-in and callback
//!
//! Reads never fail: a missing, undecryptable, malformed or expired cookie is
//! simply absent.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, PrivateCookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ymir_oauth::{AccountData, UserInfo};

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "ymir.session_token";
pub const ACCOUNT_COOKIE: &str = "dlai_account_data";
pub const OAUTH_STATE_COOKIE: &str = "ymir.oauth_state";

/// Path the OAuth state cookie is scoped to.
pub const OAUTH_STATE_PATH: &str = "/api/auth";

pub const SESSION_MAX_AGE: time::Duration = time::Duration::days(7);
pub const ACCOUNT_MAX_AGE: time::Duration = time::Duration::days(30);
pub const OAUTH_STATE_MAX_AGE: time::Duration = time::Duration::minutes(10);

/// Session metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The base session stored in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user: UserInfo,
    pub session: SessionInfo,
}

impl SessionData {
    /// Start a new session for `user`.
    pub fn new(user: UserInfo) -> Self {
        let created_at = Utc::now();
        let lifetime = chrono::Duration::seconds(SESSION_MAX_AGE.whole_seconds());
        Self {
            session: SessionInfo {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                created_at,
                expires_at: created_at + lifetime,
            },
            user,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.session.expires_at <= Utc::now()
    }
}

/// User as seen by session readers: the base user plus the DLAI fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(flatten)]
    pub base: UserInfo,
    pub dlai_jwt_token: Option<String>,
    pub dlai_user_id: Option<i64>,
    pub dlai_user_hash: Option<String>,
}

/// Enriched session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    pub session: SessionInfo,
}

/// Attach the DLAI account fields to a base session.
pub fn enrich(base: SessionData, account: Option<AccountData>) -> Session {
    let (token, user_id, hash) = match account {
        Some(data) => (
            Some(data.dlai_jwt_token),
            Some(data.dlai_user_id),
            data.dlai_user_hash,
        ),
        None => (None, None, None),
    };

    Session {
        user: SessionUser {
            base: base.user,
            dlai_jwt_token: token,
            dlai_user_id: user_id,
            dlai_user_hash: hash,
        },
        session: base.session,
    }
}

/// Read the base session from the session cookie.
pub fn read_session(jar: &PrivateCookieJar) -> Option<SessionData> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let data: SessionData = match serde_json::from_str(cookie.value()) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed session cookie");
            return None;
        }
    };
    if data.is_expired() {
        tracing::debug!(session_id = %data.session.id, "Session expired");
        return None;
    }
    Some(data)
}

/// Read the DLAI account fields from the account cookie.
pub fn read_account_data(jar: &PrivateCookieJar) -> Option<AccountData> {
    jar.get(ACCOUNT_COOKIE)
        .and_then(|cookie| AccountData::parse(cookie.value()))
}

/// Read and enrich the current session.
pub fn load_session(jar: &PrivateCookieJar) -> Option<Session> {
    let base = read_session(jar)?;
    Some(enrich(base, read_account_data(jar)))
}

/// Extractor for the current (possibly absent) session.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        Ok(CurrentSession(load_session(&jar)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sign-out
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a best-effort local sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutOutcome {
    /// A live session was found and terminated.
    SignedOut { session_id: String, user_id: String },
    /// Nothing could be terminated; cookie cleanup proceeds regardless.
    Failed { reason: String },
}

impl SignOutOutcome {
    pub fn is_signed_out(&self) -> bool {
        matches!(self, SignOutOutcome::SignedOut { .. })
    }
}

/// Terminate the local session carried by `jar`.
pub fn sign_out(jar: &PrivateCookieJar) -> SignOutOutcome {
    if jar.get(SESSION_COOKIE).is_none() {
        return SignOutOutcome::Failed {
            reason: "no readable session cookie".to_string(),
        };
    }
    match read_session(jar) {
        Some(data) => SignOutOutcome::SignedOut {
            session_id: data.session.id,
            user_id: data.user.id,
        },
        None => SignOutOutcome::Failed {
            reason: "session cookie is malformed or expired".to_string(),
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cookie builders
// ─────────────────────────────────────────────────────────────────────────────

fn cookie(
    name: &'static str,
    value: String,
    path: &'static str,
    max_age: time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path(path)
        .secure(secure)
        .max_age(max_age)
        .build()
}

pub fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    cookie(SESSION_COOKIE, value, "/", SESSION_MAX_AGE, secure)
}

pub fn account_cookie(value: String, secure: bool) -> Cookie<'static> {
    cookie(ACCOUNT_COOKIE, value, "/", ACCOUNT_MAX_AGE, secure)
}

pub fn oauth_state_cookie(value: String, secure: bool) -> Cookie<'static> {
    cookie(
        OAUTH_STATE_COOKIE,
        value,
        OAUTH_STATE_PATH,
        OAUTH_STATE_MAX_AGE,
        secure,
    )
}

/// An already-expired cookie (`Max-Age=0`) that makes the browser drop `name`.
pub fn expired_cookie(name: &'static str, path: &'static str, secure: bool) -> Cookie<'static> {
    cookie(name, String::new(), path, time::Duration::ZERO, secure)
}

/// Plain jar expiring the session and account cookies.
///
/// Emitted unconditionally, whether or not the request carried them.
pub fn expire_session_cookies(secure: bool) -> CookieJar {
    CookieJar::new()
        .add(expired_cookie(SESSION_COOKIE, "/", secure))
        .add(expired_cookie(ACCOUNT_COOKIE, "/", secure))
}
