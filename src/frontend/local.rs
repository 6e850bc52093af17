//! In-process handlers for routes owned by this node's server type.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::routing::Route;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("a handler is already registered for route {route}")]
pub struct HandlerExists {
    pub route: String,
}

/// Handles one local route. Runs on the connection's task and must not block.
pub trait LocalHandler: Send + Sync {
    fn handle(&self, session: &mut Session, payload: &[u8]) -> Result<Vec<u8>, HandlerError>;
}

impl<F> LocalHandler for F
where
    F: Fn(&mut Session, &[u8]) -> Result<Vec<u8>, HandlerError> + Send + Sync,
{
    fn handle(&self, session: &mut Session, payload: &[u8]) -> Result<Vec<u8>, HandlerError> {
        self(session, payload)
    }
}

/// Local handlers keyed by full route.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Route, Box<dyn LocalHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, route: Route, handler: Box<dyn LocalHandler>) -> Result<(), HandlerExists> {
        if self.handlers.contains_key(&route) {
            return Err(HandlerExists {
                route: route.to_string(),
            });
        }
        tracing::debug!(route = %route, "Local handler registered");
        self.handlers.insert(route, handler);
        Ok(())
    }

    pub fn get(&self, route: &Route) -> Option<&dyn LocalHandler> {
        self.handlers.get(route).map(|h| h.as_ref())
    }

    pub fn contains(&self, route: &Route) -> bool {
        self.handlers.contains_key(route)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<String> = self.handlers.keys().map(Route::to_string).collect();
        routes.sort();
        f.debug_struct("HandlerRegistry").field("routes", &routes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ConnectionId;

    fn echo(_: &mut Session, payload: &[u8]) -> Result<Vec<u8>, HandlerError> {
        Ok(payload.to_vec())
    }

    #[test]
    fn duplicate_route_is_rejected() {
        let mut registry = HandlerRegistry::new();
        let route = Route::parse("connector.echo").unwrap();
        registry.register(route.clone(), Box::new(echo)).unwrap();

        let err = registry.register(route.clone(), Box::new(echo)).unwrap_err();
        assert_eq!(err.route, "connector.echo");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn closures_are_handlers() {
        let mut registry = HandlerRegistry::new();
        let route = Route::parse("connector.whoami").unwrap();
        registry
            .register(
                route.clone(),
                Box::new(|session: &mut Session, _: &[u8]| -> Result<Vec<u8>, HandlerError> {
                    Ok(session.id().to_string().into_bytes())
                }),
            )
            .unwrap();

        let mut session = Session::new(ConnectionId::new(), "127.0.0.1:1".parse().unwrap());
        let body = registry.get(&route).unwrap().handle(&mut session, b"").unwrap();
        assert_eq!(body, session.id().to_string().into_bytes());
        assert!(registry.get(&Route::parse("connector.other").unwrap()).is_none());
    }
}
