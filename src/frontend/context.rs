//! Process-scoped routing context, frozen at the end of bootstrap.

use std::sync::Arc;

use thiserror::Error;

use crate::cluster::{ForwardError, Forwarder, ServerDiscovery};
use crate::frontend::local::{HandlerError, HandlerRegistry};
use crate::frontend::role::ServerRole;
use crate::routing::{Route, RouteDictionary};
use crate::session::Session;
use crate::strategy::{RouteContext, RoutingError, StrategyRegistry};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no local handler for route {route}")]
    UnknownRoute { route: String },

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Forward(#[from] ForwardError),
}

impl DispatchError {
    /// Whether the client may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchError::Routing(RoutingError::NoServerAvailable { .. }) => true,
            DispatchError::Forward(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Everything the request path reads. Shared behind an `Arc`, never mutated.
#[derive(Debug)]
pub struct FrontendContext {
    dictionary: RouteDictionary,
    strategies: StrategyRegistry,
    handlers: HandlerRegistry,
    discovery: Arc<dyn ServerDiscovery>,
    forwarder: Arc<dyn Forwarder>,
    role: ServerRole,
}

impl FrontendContext {
    pub(crate) fn new(
        dictionary: RouteDictionary,
        strategies: StrategyRegistry,
        handlers: HandlerRegistry,
        discovery: Arc<dyn ServerDiscovery>,
        forwarder: Arc<dyn Forwarder>,
        role: ServerRole,
    ) -> Self {
        Self {
            dictionary,
            strategies,
            handlers,
            discovery,
            forwarder,
            role,
        }
    }

    pub fn dictionary(&self) -> &RouteDictionary {
        &self.dictionary
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn role(&self) -> &ServerRole {
        &self.role
    }

    /// A route is local when its service is this node's server type.
    pub fn is_local(&self, route: &Route) -> bool {
        route.service() == self.role.server_type
    }

    /// Handle `route` in-process or forward it to the server the strategy picks.
    pub async fn dispatch(
        &self,
        session: &mut Session,
        route: &Route,
        payload: &[u8],
    ) -> Result<Vec<u8>, DispatchError> {
        if self.is_local(route) {
            let handler = self.handlers.get(route).ok_or_else(|| DispatchError::UnknownRoute {
                route: route.to_string(),
            })?;
            return Ok(handler.handle(session, payload)?);
        }

        let session: &Session = session;
        let pool = self.discovery.servers_of_type(route.service());
        let ctx = RouteContext::new(session, route, payload);
        let server = self.strategies.resolve(&ctx, &pool)?;

        let body = self.forwarder.forward(server, session, route, payload).await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ServerDescriptor, StaticDiscovery};
    use crate::frontend::connector;
    use crate::net::ConnectionId;
    use crate::strategy::FixedPick;
    use futures_util::future::BoxFuture;

    /// Echoes the chosen server id instead of touching the network.
    #[derive(Debug)]
    struct EchoServerId;

    impl Forwarder for EchoServerId {
        fn forward<'a>(
            &'a self,
            server: &'a ServerDescriptor,
            _session: &'a Session,
            _route: &'a Route,
            _payload: &'a [u8],
        ) -> BoxFuture<'a, Result<Vec<u8>, ForwardError>> {
            Box::pin(async move { Ok(server.id.clone().into_bytes()) })
        }
    }

    fn context(strategies: StrategyRegistry, servers: &[&str]) -> FrontendContext {
        let discovery = StaticDiscovery::new(
            servers
                .iter()
                .map(|id| ServerDescriptor::new(*id, "room", format!("127.0.0.1:{}", 4000 + id.len()))),
        );
        let mut handlers = HandlerRegistry::new();
        for (name, handler) in connector::component("connector") {
            handlers.register(Route::parse(&name).unwrap(), handler).unwrap();
        }
        FrontendContext::new(
            RouteDictionary::new(),
            strategies,
            handlers,
            Arc::new(discovery),
            Arc::new(EchoServerId),
            ServerRole::frontend("connector"),
        )
    }

    fn session() -> Session {
        Session::new(ConnectionId::new(), "127.0.0.1:1".parse().unwrap())
    }

    #[tokio::test]
    async fn local_routes_run_in_process() {
        let ctx = context(StrategyRegistry::new(), &[]);
        let mut session = session();

        let set = Route::parse("connector.setsessiondata").unwrap();
        ctx.dispatch(&mut session, &set, br#"{"uid":"bob"}"#).await.unwrap();
        assert_eq!(session.get("uid"), Some(&serde_json::json!("bob")));

        let missing = Route::parse("connector.nothing").unwrap();
        let err = ctx.dispatch(&mut session, &missing, b"").await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownRoute { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn remote_routes_use_registered_strategy() {
        let mut strategies = StrategyRegistry::new();
        strategies.register("room", FixedPick::new("room-2")).unwrap();
        let ctx = context(strategies, &["room-1", "room-2", "room-3"]);
        let route = Route::parse("room.join").unwrap();

        for _ in 0..3 {
            let body = ctx.dispatch(&mut session(), &route, b"").await.unwrap();
            assert_eq!(body, b"room-2");
        }
    }

    #[tokio::test]
    async fn empty_pool_is_retryable() {
        let ctx = context(StrategyRegistry::new(), &[]);
        let route = Route::parse("room.join").unwrap();

        let err = ctx.dispatch(&mut session(), &route, b"").await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Routing(RoutingError::NoServerAvailable { ref service }) if service == "room"
        ));
        assert!(err.is_retryable());
    }
}
