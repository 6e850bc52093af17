//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check dictionary entries, strategy bindings and static membership
//! - Validate value ranges (limits > 0, derived ports fit in u16)
//! - Detect conflicting acceptor addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FrontendConfig → Result<(), Vec<ValidationError>>
//! - Runs before any listener is bound

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::FrontendConfig;
use crate::routing::route::is_identifier;
use crate::routing::{DictionaryError, RouteDictionary};
use crate::strategy::StrategyKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server type {0:?} must be a non-empty identifier of [A-Za-z0-9_-]")]
    InvalidServerType(String),

    #[error("listen port {0} leaves no room for the derived acceptors")]
    PortOverflow(u16),

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("acceptor address {0:?} is not a socket address")]
    InvalidAcceptorAddress(String),

    #[error("acceptor address {0} is configured more than once")]
    DuplicateAcceptor(String),

    #[error("backend nodes cannot declare acceptors")]
    BackendWithAcceptors,

    #[error("TLS file {0:?} does not exist")]
    TlsFileMissing(String),

    #[error("dictionary entry {name:?} = {code}: {source}")]
    Dictionary {
        name: String,
        code: u16,
        #[source]
        source: DictionaryError,
    },

    #[error("strategy bound to invalid service name {0:?}")]
    InvalidStrategyService(String),

    #[error("fixed strategy for service {0:?} has an empty server id")]
    EmptyFixedServerId(String),

    #[error("static server {0:?} is listed more than once")]
    DuplicateServer(String),

    #[error("static server {id:?} has invalid server type {server_type:?}")]
    InvalidServer { id: String, server_type: String },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &FrontendConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_identifier(&config.server_type) {
        errors.push(ValidationError::InvalidServerType(config.server_type.clone()));
    }
    if config.max_connections == 0 {
        errors.push(ValidationError::ZeroLimit("max_connections"));
    }
    if config.max_frame_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_frame_bytes"));
    }
    if config.handshake_timeout_secs == 0 {
        errors.push(ValidationError::ZeroLimit("handshake_timeout_secs"));
    }
    if config.forward_timeout_secs == 0 {
        errors.push(ValidationError::ZeroLimit("forward_timeout_secs"));
    }

    validate_acceptors(config, &mut errors);
    validate_dictionary(config, &mut errors);
    validate_strategies(config, &mut errors);
    validate_servers(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_acceptors(config: &FrontendConfig, errors: &mut Vec<ValidationError>) {
    if !config.frontend {
        if !config.acceptors.is_empty() {
            errors.push(ValidationError::BackendWithAcceptors);
        }
        return;
    }

    if config.acceptors.is_empty() {
        let highest = if config.tls.is_some() { 2 } else { 1 };
        if config.listen_port.checked_add(highest).is_none() {
            errors.push(ValidationError::PortOverflow(config.listen_port));
        }
    }

    let mut seen = HashSet::new();
    for acceptor in config.effective_acceptors() {
        match acceptor.address.parse::<SocketAddr>() {
            Ok(addr) if addr.port() != 0 && !seen.insert(addr) => {
                errors.push(ValidationError::DuplicateAcceptor(acceptor.address.clone()));
            }
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::InvalidAcceptorAddress(acceptor.address.clone())),
        }

        if let Some(tls) = &acceptor.tls {
            for path in [&tls.cert_path, &tls.key_path] {
                if !Path::new(path).exists() {
                    errors.push(ValidationError::TlsFileMissing(path.clone()));
                }
            }
        }
    }
}

fn validate_dictionary(config: &FrontendConfig, errors: &mut Vec<ValidationError>) {
    let mut dictionary = RouteDictionary::new();
    for entry in &config.dictionary {
        if let Err(source) = dictionary.define(&entry.name, entry.code) {
            errors.push(ValidationError::Dictionary {
                name: entry.name.clone(),
                code: entry.code,
                source,
            });
        }
    }
}

fn validate_strategies(config: &FrontendConfig, errors: &mut Vec<ValidationError>) {
    for (service, kind) in &config.strategies {
        if !is_identifier(service) {
            errors.push(ValidationError::InvalidStrategyService(service.clone()));
        }
        if let StrategyKind::Fixed { server_id } = kind {
            if server_id.is_empty() {
                errors.push(ValidationError::EmptyFixedServerId(service.clone()));
            }
        }
    }
}

fn validate_servers(config: &FrontendConfig, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for server in &config.servers {
        if !seen.insert(server.id.as_str()) {
            errors.push(ValidationError::DuplicateServer(server.id.clone()));
        }
        if !is_identifier(&server.server_type) {
            errors.push(ValidationError::InvalidServer {
                id: server.id.clone(),
                server_type: server.server_type.clone(),
            });
        }
    }
}
