//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (frontend::bootstrap):
//!     Register strategies → Define dictionary → Seal → Bind acceptors → Declare role → Accept
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Close acceptors → In-flight connections finish on their own
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: listeners bind last (traffic only when the router is ready)
//! - Shutdown is a sticky flag, so a trigger racing a subscription is never lost
//! - Closing acceptors never closes already-accepted connections

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
