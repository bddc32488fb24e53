//! Server-rendered landing page.

use axum::{extract::Query, response::Html};
use serde::Deserialize;

use crate::session::{CurrentSession, Session};

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;max-width:40rem;margin:3rem auto;padding:0 1rem;color:#222}\
table{border-collapse:collapse;margin:1rem 0}\
td,th{border:1px solid #ccc;padding:.4rem .8rem;text-align:left}\
button{padding:.5rem 1rem;cursor:pointer}\
button:disabled{cursor:not-allowed;opacity:.5}\
pre{background:#f4f4f4;padding:1rem;overflow:auto}\
.error{color:#b00020}";

const SCRIPT: &str = include_str!("page.js");

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub error: Option<String>,
}

/// `GET /`
pub async fn page_handler(
    CurrentSession(session): CurrentSession,
    Query(params): Query<PageParams>,
) -> Html<String> {
    let body = match session {
        Some(session) => signed_in(&session),
        None => signed_out(params.error.as_deref()),
    };
    Html(layout(&body))
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Ymir Integration Example</title>\n<style>{}</style>\n</head>\n\
         <body>\n{}</body>\n</html>\n",
        STYLE, body
    )
}

fn signed_out(error: Option<&str>) -> String {
    let mut html = String::from("<h1>Ymir Integration Example</h1>\n");
    if let Some(error) = error.filter(|e| !e.is_empty()) {
        html.push_str(&format!(
            "<p class=\"error\">Sign-in failed: {}</p>\n",
            escape_html(error)
        ));
    }
    html.push_str("<p>Sign in to see your DLAI profile.</p>\n");
    html.push_str(
        "<form method=\"get\" action=\"/api/auth/sign-in/dlai\">\n\
         <button type=\"submit\">Sign in with DLAI</button>\n</form>\n",
    );
    html
}

fn signed_in(session: &Session) -> String {
    let user = &session.user;
    let display_name = user
        .base
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&user.base.email);
    let dlai_user_id = user
        .dlai_user_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let has_token = user.dlai_jwt_token.as_deref().is_some_and(|t| !t.is_empty());

    format!(
        "<h1>Welcome, {name}!</h1>\n\
         <table>\n\
         <tr><th>Email</th><td>{email}</td></tr>\n\
         <tr><th>DLAI User ID</th><td>{user_id}</td></tr>\n\
         <tr><th>Has JWT Token</th><td>{token}</td></tr>\n\
         </table>\n\
         <button id=\"fetch-profile\" type=\"button\"{disabled}>Fetch Profile from DLAI API</button>\n\
         <p id=\"profile-error\" class=\"error\"></p>\n\
         <pre id=\"profile-output\" hidden></pre>\n\
         <form method=\"post\" action=\"/api/auth/logout\">\n\
         <button type=\"submit\">Sign out</button>\n</form>\n\
         <script>\n{script}</script>\n",
        name = escape_html(display_name),
        email = escape_html(&user.base.email),
        user_id = escape_html(&dlai_user_id),
        token = if has_token { "Yes" } else { "No" },
        disabled = if has_token { "" } else { " disabled" },
        script = SCRIPT,
    )
}

/// Escape text for interpolation into HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
