//! Configuration Management
//!
//! This module handles loading and saving the default connection settings.
//!
//! # Configuration Locations
//! - Local: `.pantry/config.json` (per-directory)
//! - Global: `~/.config/pantry/config.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Local config file (`.pantry/config.json`), used as a whole when present
//! 2. Global config file (`~/.config/pantry/config.json`)
//! 3. Built-in defaults (`ConnectionConfig::default()`)
//!
//! Every field in a file is optional; missing fields take the built-in default.
//!
//! # File Format
//! ```json
//! {
//!   "connection": {
//!     "engine": "mysql",
//!     "host": "localhost",
//!     "user": "pantryuser",
//!     "password_env": "PANTRY_PASSWORD",
//!     "database": "pantrydb",
//!     "table": "Food"
//!   },
//!   "logging": { "level": "warn", "format": "pretty" }
//! }
//! ```

pub mod logging;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::ConnectionConfig;
use crate::error::{PantryError, Result};

pub use logging::{LogFormat, LoggingConfig};

/// Contents of one config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PantryConfig {
    /// Default connection settings offered at session start
    pub connection: StoredConnection,

    /// Tracing subscriber settings
    pub logging: LoggingConfig,
}

/// Stored connection configuration
///
/// Same fields as `ConnectionConfig`, plus an optional environment variable
/// reference for the password.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConnection {
    /// Connection configuration
    #[serde(flatten)]
    pub config: ConnectionConfig,

    /// Environment variable name for password (if not storing password directly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl StoredConnection {
    /// Resolve environment variables and return a `ConnectionConfig`
    pub fn resolve(&self) -> Result<ConnectionConfig> {
        let mut config = self.config.clone();

        if let Some(env_var) = &self.password_env {
            match std::env::var(env_var) {
                Ok(password) => config.password = password,
                Err(_) => {
                    return Err(PantryError::config_error(format!(
                        "Environment variable {env_var} not found for password"
                    )));
                }
            }
        }

        Ok(config)
    }
}

/// Get path to local config file (`.pantry/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        PantryError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".pantry").join("config.json"))
}

/// Get path to global config file (`~/.config/pantry/config.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| PantryError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("pantry").join("config.json"))
}

/// Load a config file, `None` if it does not exist
pub fn load_file(path: &Path) -> Result<Option<PantryConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| PantryError::config_error(format!("Could not read config file: {e}")))?;

    serde_json::from_str(&contents).map(Some).map_err(|e| {
        PantryError::config_error(format!("Invalid config file {}: {e}", path.display()))
    })
}

/// Save a config file, creating its directory if needed
pub fn save_file(path: &Path, config: &PantryConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            PantryError::config_error(format!("Could not create config directory: {e}"))
        })?;
    }

    let contents = serde_json::to_string_pretty(config)
        .map_err(|e| PantryError::config_error(format!("Could not serialize config: {e}")))?;

    fs::write(path, contents)
        .map_err(|e| PantryError::config_error(format!("Could not write config file: {e}")))?;

    Ok(())
}

/// Load from explicit paths: local wins over global, built-in defaults otherwise
pub fn load_from(local: &Path, global: &Path) -> Result<PantryConfig> {
    if let Some(config) = load_file(local)? {
        return Ok(config);
    }

    Ok(load_file(global)?.unwrap_or_default())
}

/// Load configuration with precedence (local, then global, then defaults)
pub fn load_with_precedence() -> Result<PantryConfig> {
    load_from(&local_config_path()?, &global_config_path()?)
}

/// Resolve the connection snapshot a session starts from
pub fn resolve_connection(config: &PantryConfig) -> Result<ConnectionConfig> {
    config.connection.resolve()
}

/// Store `connection` as the default connection in the file at `path`
///
/// The file's logging section and password variable survive. When the password
/// comes from an environment variable it is not written to disk.
pub fn save_connection(path: &Path, connection: &ConnectionConfig) -> Result<()> {
    let mut file = load_file(path)?.unwrap_or_default();

    file.connection.config = connection.clone();
    if file.connection.password_env.is_some() {
        file.connection.config.password = String::new();
    }

    save_file(path, &file)
}
