//! Request and response envelopes.
//!
//! Request layout:
//! ```text
//! +-------+---------------------------------+-----------+
//! | flags | route                           | payload   |
//! | u8    | u16 code (flags & 1)            | remaining |
//! |       | or u8 len + utf-8 name          |           |
//! +-------+---------------------------------+-----------+
//! ```
//!
//! Response layout: one status byte followed by the body.

use thiserror::Error;

use crate::routing::{Route, RouteDictionary, RouteError};

const FLAG_COMPRESSED_ROUTE: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,

    #[error("message truncated")]
    Truncated,

    #[error("unknown flags {0:#04x}")]
    UnknownFlags(u8),

    #[error("unknown route code {0}")]
    UnknownRouteCode(u16),

    #[error("route is not valid utf-8")]
    InvalidUtf8,

    #[error(transparent)]
    InvalidRoute(#[from] RouteError),

    #[error("unknown response status {0}")]
    UnknownStatus(u8),
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub route: Route,
    pub payload: Vec<u8>,
}

/// Encode a request, compressing the route when `dictionary` knows it.
pub fn encode_request(route: &Route, payload: &[u8], dictionary: Option<&RouteDictionary>) -> Vec<u8> {
    let name = route.to_string();
    let code = dictionary.and_then(|d| d.encode(&name));

    let mut out = Vec::with_capacity(3 + name.len() + payload.len());
    match code {
        Some(code) => {
            out.push(FLAG_COMPRESSED_ROUTE);
            out.extend_from_slice(&code.to_be_bytes());
        }
        None => {
            // Route::parse bounds names to 255 bytes.
            out.push(0);
            out.push(name.len() as u8);
            out.extend_from_slice(name.as_bytes());
        }
    }
    out.extend_from_slice(payload);
    out
}

/// Decode a request, expanding compressed routes through `dictionary`.
pub fn decode_request(frame: &[u8], dictionary: &RouteDictionary) -> Result<Request, ProtocolError> {
    let (&flags, rest) = frame.split_first().ok_or(ProtocolError::Empty)?;
    if flags & !FLAG_COMPRESSED_ROUTE != 0 {
        return Err(ProtocolError::UnknownFlags(flags));
    }

    let (route, payload) = if flags & FLAG_COMPRESSED_ROUTE != 0 {
        if rest.len() < 2 {
            return Err(ProtocolError::Truncated);
        }
        let code = u16::from_be_bytes([rest[0], rest[1]]);
        let name = dictionary
            .decode(code)
            .ok_or(ProtocolError::UnknownRouteCode(code))?;
        (Route::parse(name)?, &rest[2..])
    } else {
        let (&len, rest) = rest.split_first().ok_or(ProtocolError::Truncated)?;
        let len = len as usize;
        if rest.len() < len {
            return Err(ProtocolError::Truncated);
        }
        let name = std::str::from_utf8(&rest[..len]).map_err(|_| ProtocolError::InvalidUtf8)?;
        (Route::parse(name)?, &rest[len..])
    };

    Ok(Request {
        route,
        payload: payload.to_vec(),
    })
}

/// Outcome class of a response.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    Error = 1,
    /// The request failed for a transient reason; the client may retry.
    Retryable = 2,
}

impl TryFrom<u8> for Status {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Error),
            2 => Ok(Status::Retryable),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            body,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            status: Status::Error,
            body: message.to_string().into_bytes(),
        }
    }

    pub fn retryable(message: impl std::fmt::Display) -> Self {
        Self {
            status: Status::Retryable,
            body: message.to_string().into_bytes(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.body.len());
        out.push(self.status as u8);
        out.extend_from_slice(&self.body);
        out
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&status, body) = frame.split_first().ok_or(ProtocolError::Empty)?;
        Ok(Self {
            status: Status::try_from(status)?,
            body: body.to_vec(),
        })
    }
}
