//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + command line overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, every error reported)
//!     → FrontendConfig (validated, immutable)
//!     → FrontendBuilder::from_config applies it in bootstrap order
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the dictionary and strategies cannot change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{builtin_config, load_config, parse_config, parse_config_str, ConfigError, BUILTIN_CONFIG};
pub use schema::{
    AcceptorConfig, FrontendConfig, LogFormat, ObservabilityConfig, TlsConfig, TransportKind,
};
pub use validation::{validate_config, ValidationError};
