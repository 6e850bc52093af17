//! Message framing between clients, this frontend and cluster peers.
//!
//! # Data Flow
//! ```text
//! byte stream (tcp / tls)        websocket message
//!     → frame.rs (u32 length prefix)   → (already framed)
//!     → envelope.rs (flags, route code or name, payload)
//!     → Request { route, payload }
//! ```
//!
//! # Design Decisions
//! - Routes are compressed to dictionary codes whenever the dictionary knows them
//! - Payload bytes are opaque; serialization belongs to handlers

pub mod envelope;
pub mod frame;

pub use envelope::{decode_request, encode_request, ProtocolError, Request, Response, Status};
pub use frame::{read_frame, write_frame, FrameError, DEFAULT_MAX_FRAME_BYTES};
