//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection (one task per acceptor)
//!     → listener.rs (accept loop, connection limits)
//!     → tls.rs (optional TLS handshake)
//!     → websocket upgrade (websocket acceptors only)
//!     → connection.rs (uniform message-oriented Connection)
//!     → acceptor.rs (merged Incoming sequence)
//!     → Hand off to the frontend
//!
//! Connection States:
//!     Accepting → Handshaking → Active → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Listeners bind eagerly; bind failures surface before any traffic
//! - Handshakes run concurrently but are yielded in accept order per listener
//! - A failed handshake drops only that connection

pub mod acceptor;
pub mod connection;
pub mod listener;
pub mod tls;

pub use crate::config::{AcceptorConfig, TlsConfig, TransportKind};
pub use acceptor::{AcceptorCloser, AcceptorError, AcceptorSet, Incoming};
pub use connection::{Connection, ConnectionError, ConnectionId};
pub use listener::{HandshakeError, Listener, ListenerOptions};
