//! Configuration system for the Ymir example service.
//!
//! TOML files layered with environment variables:
//! - `[server]` bind address, cookie security, logging, upstream timeout
//! - `[auth]` application/auth-server URLs, session secret, OAuth client, logout strategy
//! - `[api]` DLAI resource API base URL

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_env, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
