//! Common test utilities for integration tests.
//!
//! Starts a real server on a free port with the identity provider and the
//! DLAI resource API replaced by wiremock servers.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, StatusCode};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use ymir_config::LogoutStrategy;
use ymir_oauth::ProviderConfig;
use ymir_server::state::derive_cookie_key;
use ymir_server::{AppState, Server, ServerConfig};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const SESSION_SECRET: &str = "integration-test-session-secret-0123456789";

/// How the mocked provider answers discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Discovery {
    #[default]
    Standard,
    /// Also advertise `end_session_endpoint` at `{idp}/oidc/logout`.
    WithEndSession,
    /// Discovery returns 503.
    Unavailable,
}

#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    pub logout_strategy: LogoutStrategy,
    pub discovery: Discovery,
    /// Override the resource API URL (defaults to the wiremock API server).
    pub api_url: Option<String>,
}

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client that does not follow redirects.
    pub client: Client,
    /// Mock identity provider.
    pub idp: MockServer,
    /// Mock DLAI resource API.
    pub api: MockServer,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with default configuration.
    pub async fn start() -> Result<Self> {
        Self::start_with(TestOptions::default()).await
    }

    pub async fn start_with(options: TestOptions) -> Result<Self> {
        let idp = MockServer::start().await;
        let api = MockServer::start().await;
        mount_discovery(&idp, options.discovery).await;

        let addr = find_available_port().await?;
        let app_url = format!("http://{}", addr);
        let api_url = options.api_url.unwrap_or_else(|| api.uri());

        let config = ServerConfig::new(&app_url, idp.uri(), api_url)
            .with_bind_address(addr)
            .with_request_logging(false)
            .with_upstream_timeout(Duration::from_secs(2))
            .with_logout_strategy(options.logout_strategy);
        let provider = ProviderConfig::dlai(&app_url, &idp.uri(), CLIENT_ID, CLIENT_SECRET);
        let state = AppState::new(config, provider, SESSION_SECRET)?;

        let server = Server::new(state);
        let handle = tokio::spawn(async move {
            let _ = server.run().await;
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            idp,
            api,
            _handle: handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Make the provider's token endpoint return `id_token` (or none).
    pub async fn mock_token_endpoint(&self, id_token: Option<String>) {
        let mut body = serde_json::json!({
            "access_token": "provider-access-token",
            "token_type": "Bearer",
            "expires_in": 3600,
        });
        if let Some(id_token) = id_token {
            body["id_token"] = serde_json::Value::String(id_token);
        }
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.idp)
            .await;
    }

    /// Start sign-in and return the authorization redirect and the cookies it set.
    pub async fn begin_sign_in(&self) -> Result<(String, Vec<Cookie<'static>>)> {
        let resp = self
            .client
            .get(self.url("/api/auth/sign-in/dlai"))
            .send()
            .await?;
        anyhow::ensure!(
            resp.status() == StatusCode::SEE_OTHER,
            "sign-in returned {}",
            resp.status()
        );
        Ok((location(resp.headers())?, set_cookies(resp.headers())))
    }

    /// Run the full browser flow: sign-in, provider redirect, callback.
    pub async fn sign_in(&self) -> Result<Redirected> {
        let (authorize_url, state_cookies) = self.begin_sign_in().await?;
        let state = query_param(&authorize_url, "state")?;
        self.callback(
            &format!("code=test-code&state={}", urlencoding::encode(&state)),
            &state_cookies,
        )
        .await
    }

    /// Hit the callback endpoint with `query` and `cookies`.
    pub async fn callback(&self, query: &str, cookies: &[Cookie<'static>]) -> Result<Redirected> {
        let mut request = self
            .client
            .get(self.url(&format!("/api/auth/oauth2/callback/dlai?{}", query)));
        if let Some(header) = cookie_header(cookies) {
            request = request.header(header::COOKIE, header);
        }
        let resp = request.send().await?;
        anyhow::ensure!(
            resp.status() == StatusCode::SEE_OTHER,
            "callback returned {}",
            resp.status()
        );
        Ok(Redirected {
            location: location(resp.headers())?,
            cookies: set_cookies(resp.headers()),
        })
    }

    /// GET `path` with the given cookies.
    pub async fn get(&self, path: &str, cookies: &[Cookie<'static>]) -> Result<reqwest::Response> {
        let mut request = self.client.get(self.url(path));
        if let Some(header) = cookie_header(cookies) {
            request = request.header(header::COOKIE, header);
        }
        Ok(request.send().await?)
    }

    /// POST `path` with the given cookies and optional `Accept` header.
    pub async fn post(
        &self,
        path: &str,
        cookies: &[Cookie<'static>],
        accept: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut request = self.client.post(self.url(path));
        if let Some(header) = cookie_header(cookies) {
            request = request.header(header::COOKIE, header);
        }
        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }
        Ok(request.send().await?)
    }

    /// Current session as returned by `/api/auth/get-session`.
    pub async fn session(&self, cookies: &[Cookie<'static>]) -> Result<serde_json::Value> {
        let resp = self.get("/api/auth/get-session", cookies).await?;
        Ok(resp.json().await?)
    }
}

/// Result of a redirecting response.
#[derive(Debug)]
pub struct Redirected {
    pub location: String,
    pub cookies: Vec<Cookie<'static>>,
}

impl Redirected {
    pub fn cookie(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.iter().find(|c| c.name() == name)
    }
}

pub async fn mount_discovery(idp: &MockServer, discovery: Discovery) {
    let template = match discovery {
        Discovery::Unavailable => ResponseTemplate::new(503),
        Discovery::Standard | Discovery::WithEndSession => {
            let mut body = serde_json::json!({
                "issuer": idp.uri(),
                "authorization_endpoint": format!("{}/authorize", idp.uri()),
                "token_endpoint": format!("{}/token", idp.uri()),
                "userinfo_endpoint": format!("{}/userinfo", idp.uri()),
                "jwks_uri": format!("{}/jwks", idp.uri()),
            });
            if discovery == Discovery::WithEndSession {
                body["end_session_endpoint"] =
                    serde_json::Value::String(format!("{}/oidc/logout", idp.uri()));
            }
            ResponseTemplate::new(200).set_body_json(body)
        }
    };
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(template)
        .mount(idp)
        .await;
}

/// Build an unsigned identity token carrying `claims`.
pub fn id_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

/// Encrypt `value` under the test session secret, as the server would.
pub fn encrypted_cookie(name: &'static str, value: &str) -> Cookie<'static> {
    let key = derive_cookie_key(SESSION_SECRET).expect("valid secret");
    let response = PrivateCookieJar::new(key)
        .add(Cookie::new(name, value.to_string()))
        .into_response();
    set_cookies(response.headers())
        .into_iter()
        .next()
        .expect("encrypted cookie")
}

/// Parse every `Set-Cookie` header.
pub fn set_cookies(headers: &HeaderMap) -> Vec<Cookie<'static>> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_string()).ok())
        .collect()
}

/// Whether `cookies` expire `name` (`Max-Age=0`).
pub fn expires(cookies: &[Cookie<'static>], name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.name() == name && c.max_age() == Some(time::Duration::ZERO))
}

/// `Cookie` request header for the live cookies in `cookies`.
pub fn cookie_header(cookies: &[Cookie<'static>]) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| c.max_age() != Some(time::Duration::ZERO) && !c.value().is_empty())
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

pub fn location(headers: &HeaderMap) -> Result<String> {
    Ok(headers
        .get(header::LOCATION)
        .context("missing Location header")?
        .to_str()?
        .to_string())
}

pub fn query_param(url: &str, name: &str) -> Result<String> {
    reqwest::Url::parse(url)?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .with_context(|| format!("missing query parameter {}", name))
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
