//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/ymir/config.toml` (XDG user config)
//! 2. `./ymir.toml` (project-local)
//! 3. Environment variables
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, YmirConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "ymir.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "ymir";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "YMIR_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: YmirConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all layers.
///
/// With `explicit` set, only that file is read (it must exist); otherwise the
/// user config and `./ymir.toml` are tried. Environment variables are applied
/// last in both cases.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let env_layer = YmirConfig::from_env()?;
    load_config_with_env(explicit, xdg_config_path(), env_layer)
}

/// Load configuration with explicit user-config path and environment layer.
pub fn load_config_with_env(
    explicit: Option<&Path>,
    user_config: Option<PathBuf>,
    env_layer: YmirConfig,
) -> Result<LoadedConfig> {
    let mut config = YmirConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    match explicit {
        Some(path) => {
            config.merge(load_config_file(path)?);
            sources.push(ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            });
        }
        None => {
            if let Some(path) = user_config {
                sources.push(load_layer(&mut config, &path, &mut warnings));
            }
            let project_path = PathBuf::from(PROJECT_CONFIG_FILE);
            sources.push(load_layer(&mut config, &project_path, &mut warnings));
        }
    }

    if config.auth.session_secret.is_some() || config.auth.client_secret.is_some() {
        warnings.push(
            "Config file contains secrets in plaintext. \
             Consider SESSION_SECRET / DLAI_OAUTH_CLIENT_SECRET environment variables instead."
                .to_string(),
        );
    }

    config.merge(env_layer);

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<YmirConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    YmirConfig::from_toml(&contents)
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Config directory for ymir.
///
/// Checks `YMIR_CONFIG_DIR` first, then falls back to the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

fn load_layer(config: &mut YmirConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}
