//! Logging configuration and subscriber setup.
//!
//! Events go to stderr so the menus on stdout stay readable.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{PantryError, Result};

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `warn` or `pantry=debug`. `RUST_LOG` takes priority.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".into(), format: LogFormat::Pretty }
    }
}

impl LoggingConfig {
    /// Build the filter, preferring `RUST_LOG` over the configured level
    pub fn filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level).map_err(|e| {
                PantryError::config_error(format!("Invalid log level '{}': {e}", self.level))
            }),
        }
    }

    /// Install the global tracing subscriber.
    ///
    /// Fails if the level directive does not parse or a subscriber is already installed.
    pub fn init(&self) -> Result<()> {
        let filter = self.filter()?;
        let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

        let installed = match self.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.try_init(),
        };

        installed.map_err(|e| PantryError::config_error(format!("Could not start logging: {e}")))
    }
}
