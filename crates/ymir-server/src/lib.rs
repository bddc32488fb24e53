//! HTTP server for the Ymir integration example.
//!
//! Demonstrates a client application signing users in against the DLAI
//! OAuth 2.1 + PKCE identity provider, keeping the session in encrypted
//! cookies, and calling the DLAI resource API on the user's behalf.
//!
//! # Routes
//!
//! - `GET /` server-rendered page
//! - `GET /health`
//! - `GET /api/profile` proxy to `{api_url}/user/profile`
//! - `GET|POST /api/auth/sign-in/dlai`, `GET /api/auth/oauth2/callback/dlai`
//! - `GET /api/auth/get-session`, `POST /api/auth/sign-out`
//! - `POST /api/auth/logout` local plus upstream logout
//!
//! # Example
//!
//! ```ignore
//! use ymir_server::{AppState, Server};
//!
//! let resolved = ymir_config::load_config(None)?.config.resolve()?;
//! let server = Server::new(AppState::from_resolved(&resolved)?);
//! server.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use hooks::{PendingClaims, persist_claims_middleware};
pub use middleware::request_logging_middleware;
pub use session::{
    ACCOUNT_COOKIE, CurrentSession, OAUTH_STATE_COOKIE, SESSION_COOKIE, Session, SessionData,
    SessionInfo, SessionUser, SignOutOutcome,
};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Ymir HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from application state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .route("/", get(routes::page_handler))
            .route("/api/profile", get(routes::profile_handler))
            .nest("/api/auth", routes::auth_routes())
            // Claims persistence (inner layer, sees the callback response first)
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                hooks::persist_claims_middleware,
            ))
            // Request logging
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                middleware::request_logging_middleware,
            ))
            // Spans record the path, never the query string
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
            )
            .with_state(self.state.clone())
    }

    /// Run the server until the process is stopped.
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the server, shutting down gracefully when `signal` resolves.
    pub async fn run_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.bind_address();
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        info!(
            address = %addr,
            app_url = %self.state.config.app_url,
            "Ymir server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    /// Get the application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
