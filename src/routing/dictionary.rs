//! Route dictionary: bidirectional route name ↔ `u16` code mapping.
//!
//! # Responsibilities
//! - Accept (name, code) definitions during bootstrap
//! - Reject conflicting definitions without mutating state
//! - Serve lock-free lookups once sealed

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::Route;

/// One `(name, code)` pair as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DictionaryEntry {
    pub name: String,
    pub code: u16,
}

impl DictionaryEntry {
    pub fn new(name: impl Into<String>, code: u16) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

/// Errors raised while populating the dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    #[error("route {name:?} is already mapped to code {existing}")]
    DuplicateName { name: String, existing: u16 },

    #[error("code {code} is already mapped to route {existing:?}")]
    DuplicateCode { code: u16, existing: String },

    #[error("dictionary is sealed; cannot define {name:?}")]
    Sealed { name: String },

    #[error("dictionary entry {name:?} is not a valid route")]
    InvalidRoute { name: String },
}

/// Compresses route strings into small numeric codes.
///
/// Populated once at startup with [`define`](Self::define), then [`seal`](Self::seal)ed.
/// After sealing no method takes `&mut self` successfully, so the dictionary is shared
/// as `Arc<RouteDictionary>` and read concurrently without locking.
#[derive(Debug, Default, Clone)]
pub struct RouteDictionary {
    by_name: HashMap<String, u16>,
    by_code: HashMap<u16, String>,
    sealed: bool,
}

impl RouteDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define entries in order, stopping at the first error.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a DictionaryEntry>,
    ) -> Result<Self, DictionaryError> {
        let mut dict = Self::new();
        for entry in entries {
            dict.define(&entry.name, entry.code)?;
        }
        Ok(dict)
    }

    /// Map `name` to `code`.
    ///
    /// Re-defining an identical pair is a no-op. A name or code already bound to
    /// something else is rejected and the dictionary is left untouched.
    pub fn define(&mut self, name: &str, code: u16) -> Result<(), DictionaryError> {
        if self.sealed {
            return Err(DictionaryError::Sealed {
                name: name.to_string(),
            });
        }

        if Route::parse(name).is_err() {
            return Err(DictionaryError::InvalidRoute {
                name: name.to_string(),
            });
        }

        match (self.by_name.get(name), self.by_code.get(&code)) {
            (Some(&existing), _) if existing == code => return Ok(()),
            (Some(&existing), _) => {
                return Err(DictionaryError::DuplicateName {
                    name: name.to_string(),
                    existing,
                })
            }
            (None, Some(existing)) => {
                return Err(DictionaryError::DuplicateCode {
                    code,
                    existing: existing.clone(),
                })
            }
            (None, None) => {}
        }

        self.by_name.insert(name.to_string(), code);
        self.by_code.insert(code, name.to_string());
        tracing::trace!(route = %name, code, "Dictionary entry defined");
        Ok(())
    }

    /// Freeze the dictionary. Idempotent.
    pub fn seal(&mut self) {
        if !self.sealed {
            self.sealed = true;
            tracing::debug!(entries = self.by_name.len(), "Route dictionary sealed");
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Look up the code for a route name.
    pub fn encode(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    /// Look up the route name for a code.
    pub fn decode(&self, code: u16) -> Option<&str> {
        self.by_code.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
