//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::FrontendConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration used when no file is given: the connector bring-up.
pub const BUILTIN_CONFIG: &str = include_str!("../../config/frontend.toml");

/// Parse a configuration without validating it, so command line overrides
/// can be applied first.
pub fn parse_config(path: &Path) -> Result<FrontendConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<FrontendConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// The built-in connector configuration, unvalidated.
pub fn builtin_config() -> Result<FrontendConfig, ConfigError> {
    parse_config_str(BUILTIN_CONFIG)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<FrontendConfig, ConfigError> {
    let config = parse_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
