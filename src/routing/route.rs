//! Canonical `service.method` route identifiers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Longest route string accepted (fits a single length byte on the wire).
pub const MAX_ROUTE_LEN: usize = u8::MAX as usize;

/// Error returned when a route string is not a well-formed `service.method`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("malformed route {input:?}: {reason}")]
    Malformed { input: String, reason: &'static str },
}

/// A parsed request target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Route {
    service: String,
    method: String,
}

impl Route {
    /// Parse a dotted `service.method` identifier.
    pub fn parse(input: &str) -> Result<Self, RouteError> {
        let malformed = |reason| RouteError::Malformed {
            input: input.to_string(),
            reason,
        };

        if input.len() > MAX_ROUTE_LEN {
            return Err(malformed("longer than 255 bytes"));
        }

        let (service, method) = input
            .split_once('.')
            .ok_or_else(|| malformed("missing '.' separator"))?;

        if method.contains('.') {
            return Err(malformed("more than one '.' separator"));
        }
        if service.is_empty() {
            return Err(malformed("empty service name"));
        }
        if method.is_empty() {
            return Err(malformed("empty method name"));
        }
        if !is_identifier(service) || !is_identifier(method) {
            return Err(malformed("only ASCII alphanumerics, '_' and '-' are allowed"));
        }

        Ok(Self {
            service: service.to_string(),
            method: method.to_string(),
        })
    }

    /// The component / server-type namespace.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The handler name within the service.
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// True if `s` is a non-empty run of `[A-Za-z0-9_-]`.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.method)
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
