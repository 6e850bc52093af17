//! Per-connection request loop.
//!
//! Requests on one connection are handled strictly in order: one response is
//! written for each request before the next frame is read.

use std::sync::Arc;
use std::time::Instant;

use crate::frontend::context::FrontendContext;
use crate::net::Connection;
use crate::observability::metrics;
use crate::protocol::{decode_request, Response};
use crate::routing::Route;
use crate::session::Session;

/// Metric label for requests whose route this node does not know.
const UNKNOWN_ROUTE_LABEL: &str = "other";

/// Serve `connection` until the peer closes it or its transport fails.
pub async fn serve_connection(context: Arc<FrontendContext>, mut connection: Connection) {
    let connection_id = connection.id();
    let mut session = Session::new(connection_id, connection.peer_addr());
    tracing::debug!(
        connection_id = %connection_id,
        peer_addr = %connection.peer_addr(),
        transport = ?connection.kind(),
        secure = connection.is_secure(),
        "Connection opened"
    );

    loop {
        let frame = match connection.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "Connection read failed");
                break;
            }
        };

        let response = handle_frame(&context, &mut session, &frame).await;
        if let Err(e) = connection.send(&response.encode()).await {
            tracing::warn!(connection_id = %connection_id, error = %e, "Connection write failed");
            break;
        }
    }

    connection.close().await;
    tracing::debug!(connection_id = %connection_id, "Connection closed");
}

/// Decode and dispatch one request. Never fails: every error becomes a response.
pub async fn handle_frame(context: &FrontendContext, session: &mut Session, frame: &[u8]) -> Response {
    let start = Instant::now();

    let request = match decode_request(frame, context.dictionary()) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(connection_id = %session.id(), error = %e, "Malformed request");
            metrics::record_request("invalid", "error", start);
            return Response::error(e);
        }
    };

    let route = request.route.to_string();
    let label = route_label(context, &request.route, &route);
    match context.dispatch(session, &request.route, &request.payload).await {
        Ok(body) => {
            metrics::record_request(label, "ok", start);
            Response::ok(body)
        }
        Err(e) if e.is_retryable() => {
            tracing::info!(connection_id = %session.id(), route = %route, error = %e, "Request failed, retryable");
            metrics::record_request(label, "retryable", start);
            Response::retryable(e)
        }
        Err(e) => {
            tracing::warn!(connection_id = %session.id(), route = %route, error = %e, "Request failed");
            metrics::record_request(label, "error", start);
            Response::error(e)
        }
    }
}

/// Routes reach metric labels only when the dictionary or a local handler names them.
fn route_label<'a>(context: &FrontendContext, route: &Route, name: &'a str) -> &'a str {
    if context.dictionary().encode(name).is_some() || context.handlers().contains(route) {
        name
    } else {
        UNKNOWN_ROUTE_LABEL
    }
}
