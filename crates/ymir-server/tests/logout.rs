//! Logout integration tests.

mod common;

use anyhow::Result;
use common::{Discovery, TestOptions, TestServer, expires, id_token, set_cookies};
use ymir_config::LogoutStrategy;
use ymir_server::{ACCOUNT_COOKIE, SESSION_COOKIE};

async fn signed_in(server: &TestServer) -> Result<Vec<axum_extra::extract::cookie::Cookie<'static>>> {
    server
        .mock_token_endpoint(Some(id_token(&serde_json::json!({
            "sub": "user-1",
            "email": "ada@example.com",
            "dlaiJwtToken": "t1",
            "dlaiUserId": 42,
        }))))
        .await;
    Ok(server.sign_in().await?.cookies)
}

fn sign_out_page_url(server: &TestServer) -> String {
    format!(
        "{}/sign-out?callbackURL={}",
        server.idp.uri(),
        urlencoding::encode(&server.base_url())
    )
}

#[tokio::test]
async fn test_json_logout_with_session() -> Result<()> {
    let server = TestServer::start().await?;
    let cookies = signed_in(&server).await?;

    let resp = server
        .post("/api/auth/logout", &cookies, Some("application/json"))
        .await?;
    assert_eq!(resp.status().as_u16(), 200);

    let set = set_cookies(resp.headers());
    assert!(expires(&set, SESSION_COOKIE));
    assert!(expires(&set, ACCOUNT_COOKIE));
    assert!(set.iter().all(|c| c.path() == Some("/")));

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["redirectUrl"], sign_out_page_url(&server));

    Ok(())
}

#[tokio::test]
async fn test_logout_without_session_still_expires_cookies() -> Result<()> {
    let server = TestServer::start().await?;

    let resp = server
        .post("/api/auth/logout", &[], Some("application/json"))
        .await?;
    assert_eq!(resp.status().as_u16(), 200);

    let set = set_cookies(resp.headers());
    assert!(expires(&set, SESSION_COOKIE));
    assert!(expires(&set, ACCOUNT_COOKIE));

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["redirectUrl"], sign_out_page_url(&server));

    Ok(())
}

#[tokio::test]
async fn test_form_logout_redirects() -> Result<()> {
    let server = TestServer::start().await?;
    let cookies = signed_in(&server).await?;

    let resp = server
        .post("/api/auth/logout", &cookies, Some("text/html"))
        .await?;
    assert_eq!(resp.status().as_u16(), 303);
    assert_eq!(common::location(resp.headers())?, sign_out_page_url(&server));

    let set = set_cookies(resp.headers());
    assert!(expires(&set, SESSION_COOKIE));
    assert!(expires(&set, ACCOUNT_COOKIE));

    Ok(())
}

#[tokio::test]
async fn test_session_is_gone_after_logout() -> Result<()> {
    let server = TestServer::start().await?;
    let mut cookies = signed_in(&server).await?;
    assert!(!server.session(&cookies).await?.is_null());

    let resp = server
        .post("/api/auth/logout", &cookies, Some("application/json"))
        .await?;
    // Apply the browser's view of the response: expired cookies replace live ones.
    let set = set_cookies(resp.headers());
    cookies.retain(|c| !set.iter().any(|s| s.name() == c.name()));
    cookies.extend(set);

    assert!(server.session(&cookies).await?.is_null());
    Ok(())
}

#[tokio::test]
async fn test_end_session_uses_discovered_endpoint() -> Result<()> {
    let server = TestServer::start_with(TestOptions {
        logout_strategy: LogoutStrategy::EndSession,
        discovery: Discovery::WithEndSession,
        ..Default::default()
    })
    .await?;

    let resp = server
        .post("/api/auth/logout", &[], Some("application/json"))
        .await?;
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(
        body["redirectUrl"],
        format!(
            "{}/oidc/logout?client_id={}&post_logout_redirect_uri={}",
            server.idp.uri(),
            common::CLIENT_ID,
            urlencoding::encode(&server.base_url())
        )
    );

    Ok(())
}

#[tokio::test]
async fn test_end_session_falls_back_when_not_advertised() -> Result<()> {
    let server = TestServer::start_with(TestOptions {
        logout_strategy: LogoutStrategy::EndSession,
        ..Default::default()
    })
    .await?;

    let resp = server
        .post("/api/auth/logout", &[], Some("application/json"))
        .await?;
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(
        body["redirectUrl"],
        format!(
            "{}/api/auth/oauth2/end-session?client_id={}&post_logout_redirect_uri={}",
            server.idp.uri(),
            common::CLIENT_ID,
            urlencoding::encode(&server.base_url())
        )
    );

    Ok(())
}

#[tokio::test]
async fn test_end_session_survives_discovery_failure() -> Result<()> {
    let server = TestServer::start_with(TestOptions {
        logout_strategy: LogoutStrategy::EndSession,
        discovery: Discovery::Unavailable,
        ..Default::default()
    })
    .await?;

    let resp = server.post("/api/auth/logout", &[], None).await?;
    assert_eq!(resp.status().as_u16(), 303);
    let location = common::location(resp.headers())?;
    assert!(location.starts_with(&format!(
        "{}/api/auth/oauth2/end-session?",
        server.idp.uri()
    )));

    let set = set_cookies(resp.headers());
    assert!(expires(&set, SESSION_COOKIE));
    assert!(expires(&set, ACCOUNT_COOKIE));

    Ok(())
}

#[tokio::test]
async fn test_local_sign_out_keeps_provider_session() -> Result<()> {
    let server = TestServer::start().await?;
    let cookies = signed_in(&server).await?;

    let resp = server.post("/api/auth/sign-out", &cookies, None).await?;
    assert_eq!(resp.status().as_u16(), 200);
    let set = set_cookies(resp.headers());
    assert!(expires(&set, SESSION_COOKIE));
    assert!(expires(&set, ACCOUNT_COOKIE));

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body, serde_json::json!({ "success": true }));

    Ok(())
}
