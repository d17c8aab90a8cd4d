/// Fixture configuration
///
/// Defaults reproduce the fixed literals the UI tests assert on. A TOML file
/// can override any subset of keys:
///
/// ```toml
/// [server]
/// port = 9090
///
/// [faults]
/// delay_ms = 500
/// ```
mod macros;
mod schemas;

pub use schemas::{FaultConfig, FixtureConfig, ServerConfig};

use std::path::Path;

use crate::errors::FixtureError;

/// Parse a configuration from TOML text
pub fn parse_config(contents: &str) -> Result<FixtureConfig, FixtureError> {
    toml::from_str::<FixtureConfig>(contents)
        .map_err(|e| FixtureError::Config(format!("Failed to parse config: {}", e)))
}

/// Load a configuration file from disk
pub fn load_config_from_path(path: &Path) -> Result<FixtureConfig, FixtureError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        FixtureError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    parse_config(&contents)
}
