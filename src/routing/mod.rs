//! Route identifiers and their wire compression.
//!
//! # Data Flow
//! ```text
//! "service.method" (from config or decoded frame)
//!     → route.rs (parse into Route, validate)
//!     → dictionary.rs (name ↔ u16 code, sealed at startup)
//!     → consulted by protocol framing on every request
//! ```
//!
//! # Design Decisions
//! - Routes are immutable once parsed
//! - Dictionary is populated during bootstrap, then sealed and shared via Arc
//! - Unknown names/codes are reported as `None`, never as errors

pub mod dictionary;
pub mod route;

pub use dictionary::{DictionaryEntry, DictionaryError, RouteDictionary};
pub use route::{Route, RouteError};
