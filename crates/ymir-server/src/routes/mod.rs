//! HTTP routes.

pub mod auth;
pub mod health;
pub mod logout;
pub mod page;
pub mod profile;

pub use auth::{
    CallbackParams, LOGIN_FAILED, SignOutResponse, auth_routes, callback_handler,
    get_session_handler, sign_in_handler, sign_out_handler,
};
pub use health::{HealthResponse, health_routes};
pub use logout::{LogoutResponse, logout_handler, upstream_logout_url};
pub use page::{PageParams, escape_html, page_handler};
pub use profile::profile_handler;
