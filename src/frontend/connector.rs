//! Built-in connector component: lets clients read and update their own session.
//!
//! Registered under the node's server type:
//! - `<type>.getsessiondata` returns the session data as a JSON object
//! - `<type>.setsessiondata` merges a JSON object into the session data

use serde_json::Value;

use crate::frontend::local::{HandlerError, LocalHandler};
use crate::session::Session;

pub const GET_SESSION_DATA: &str = "getsessiondata";
pub const SET_SESSION_DATA: &str = "setsessiondata";

#[derive(Debug, Clone, Copy, Default)]
pub struct GetSessionData;

impl LocalHandler for GetSessionData {
    fn handle(&self, session: &mut Session, _payload: &[u8]) -> Result<Vec<u8>, HandlerError> {
        serde_json::to_vec(session.data()).map_err(|e| HandlerError::Failed(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SetSessionData;

impl LocalHandler for SetSessionData {
    fn handle(&self, session: &mut Session, payload: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|e| HandlerError::InvalidPayload(e.to_string()))?;
        match value {
            Value::Object(values) => {
                tracing::debug!(connection_id = %session.id(), keys = values.len(), "Session data updated");
                session.merge(values);
                Ok(Vec::new())
            }
            other => Err(HandlerError::InvalidPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Route names and handlers of the component for `server_type`.
pub fn component(server_type: &str) -> Vec<(String, Box<dyn LocalHandler>)> {
    vec![
        (
            format!("{server_type}.{GET_SESSION_DATA}"),
            Box::new(GetSessionData) as Box<dyn LocalHandler>,
        ),
        (format!("{server_type}.{SET_SESSION_DATA}"), Box::new(SetSessionData)),
    ]
}
