//! Ordered, all-or-nothing frontend startup.
//!
//! # Startup Sequence
//! 1. Register route strategies
//! 2. Define dictionary entries, then seal the dictionary
//! 3. Register local handlers
//! 4. Validate the server role
//! 5. Bind every acceptor (any failure releases the ones already bound)
//! 6. Declare the server role
//! 7. Begin accepting
//!
//! Nothing is bound until steps 1-4 succeed, so a configuration error never
//! leaves a listener open.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cluster::{Forwarder, ServerDiscovery, StaticDiscovery, TcpForwarder};
use crate::config::FrontendConfig;
use crate::frontend::connector;
use crate::frontend::context::FrontendContext;
use crate::frontend::handler::serve_connection;
use crate::frontend::local::{HandlerExists, HandlerRegistry, LocalHandler};
use crate::frontend::role::ServerRole;
use crate::lifecycle::Shutdown;
use crate::net::{AcceptorCloser, AcceptorConfig, AcceptorError, AcceptorSet, Incoming, ListenerOptions};
use crate::protocol::DEFAULT_MAX_FRAME_BYTES;
use crate::routing::route::is_identifier;
use crate::routing::{DictionaryEntry, DictionaryError, Route, RouteDictionary, RouteError};
use crate::strategy::{RouteStrategy, RoutingError, StrategyRegistry};

const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Startup failure. Each variant names the item that caused it.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("strategy for service {service:?}: {source}")]
    Strategy {
        service: String,
        #[source]
        source: RoutingError,
    },

    #[error("dictionary entry {name:?} = {code}: {source}")]
    Dictionary {
        name: String,
        code: u16,
        #[source]
        source: DictionaryError,
    },

    #[error("handler route {route:?}: {source}")]
    HandlerRoute {
        route: String,
        #[source]
        source: RouteError,
    },

    #[error(transparent)]
    HandlerExists(#[from] HandlerExists),

    #[error("no server role declared")]
    MissingRole,

    #[error("invalid server type {server_type:?}: must match [A-Za-z0-9_-]+")]
    InvalidServerType { server_type: String },

    #[error("backend server {server_type:?} cannot have acceptors ({count} configured)")]
    BackendWithAcceptors { server_type: String, count: usize },

    #[error(transparent)]
    Acceptor(#[from] AcceptorError),
}

/// Collects the frontend's parts; `start` applies them in the fixed startup order
/// regardless of the order the builder methods were called in.
pub struct FrontendBuilder {
    strategies: Vec<(String, Box<dyn RouteStrategy>)>,
    dictionary: Vec<DictionaryEntry>,
    handlers: Vec<(String, Box<dyn LocalHandler>)>,
    connector_component: bool,
    acceptors: Vec<AcceptorConfig>,
    options: ListenerOptions,
    role: Option<ServerRole>,
    discovery: Arc<dyn ServerDiscovery>,
    forwarder: Arc<dyn Forwarder>,
}

impl Default for FrontendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontendBuilder {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
            dictionary: Vec::new(),
            handlers: Vec::new(),
            connector_component: false,
            acceptors: Vec::new(),
            options: ListenerOptions::default(),
            role: None,
            discovery: Arc::new(StaticDiscovery::default()),
            forwarder: Arc::new(TcpForwarder::new(DEFAULT_FORWARD_TIMEOUT, DEFAULT_MAX_FRAME_BYTES)),
        }
    }

    /// Builder populated from a validated configuration.
    ///
    /// Client-facing nodes also get the connector component.
    pub fn from_config(config: &FrontendConfig) -> Self {
        let mut builder = Self::new()
            .role(ServerRole::from_config(config))
            .listener_options(config.listener_options())
            .discovery(StaticDiscovery::new(config.servers.iter().cloned()))
            .forwarder(TcpForwarder::new(config.forward_timeout(), config.max_frame_bytes));

        for (service, kind) in &config.strategies {
            builder = builder.register_strategy_boxed(service.clone(), kind.build());
        }
        for entry in &config.dictionary {
            builder = builder.define_route(entry.name.clone(), entry.code);
        }
        for acceptor in config.effective_acceptors() {
            builder = builder.add_acceptor(acceptor);
        }
        if config.frontend {
            builder = builder.connector_component();
        }
        builder
    }

    pub fn register_strategy<S>(self, service: impl Into<String>, strategy: S) -> Self
    where
        S: RouteStrategy + 'static,
    {
        self.register_strategy_boxed(service, Box::new(strategy))
    }

    pub fn register_strategy_boxed(mut self, service: impl Into<String>, strategy: Box<dyn RouteStrategy>) -> Self {
        self.strategies.push((service.into(), strategy));
        self
    }

    /// Dictionary entries are defined in call order.
    pub fn define_route(mut self, name: impl Into<String>, code: u16) -> Self {
        self.dictionary.push(DictionaryEntry::new(name, code));
        self
    }

    pub fn handler<H>(mut self, route: impl Into<String>, handler: H) -> Self
    where
        H: LocalHandler + 'static,
    {
        self.handlers.push((route.into(), Box::new(handler)));
        self
    }

    /// Register `<server_type>.getsessiondata` and `<server_type>.setsessiondata`.
    pub fn connector_component(mut self) -> Self {
        self.connector_component = true;
        self
    }

    pub fn add_acceptor(mut self, acceptor: AcceptorConfig) -> Self {
        self.acceptors.push(acceptor);
        self
    }

    pub fn listener_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn role(mut self, role: ServerRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn discovery<D>(mut self, discovery: D) -> Self
    where
        D: ServerDiscovery + 'static,
    {
        self.discovery = Arc::new(discovery);
        self
    }

    pub fn forwarder<F>(mut self, forwarder: F) -> Self
    where
        F: Forwarder + 'static,
    {
        self.forwarder = Arc::new(forwarder);
        self
    }

    /// Run the startup sequence. Must be called inside a tokio runtime.
    pub async fn start(self) -> Result<Frontend, BootstrapError> {
        let mut strategies = StrategyRegistry::new();
        for (service, strategy) in self.strategies {
            strategies
                .register_boxed(service.clone(), strategy)
                .map_err(|source| BootstrapError::Strategy { service, source })?;
        }

        let mut dictionary = RouteDictionary::new();
        for entry in &self.dictionary {
            dictionary
                .define(&entry.name, entry.code)
                .map_err(|source| BootstrapError::Dictionary {
                    name: entry.name.clone(),
                    code: entry.code,
                    source,
                })?;
        }
        dictionary.seal();
        tracing::info!(
            strategies = strategies.len(),
            routes = dictionary.len(),
            "Router ready, dictionary sealed"
        );

        let role = self.role.ok_or(BootstrapError::MissingRole)?;
        if !is_identifier(&role.server_type) {
            return Err(BootstrapError::InvalidServerType {
                server_type: role.server_type,
            });
        }
        if !role.frontend && !self.acceptors.is_empty() {
            return Err(BootstrapError::BackendWithAcceptors {
                server_type: role.server_type,
                count: self.acceptors.len(),
            });
        }

        let mut handlers = HandlerRegistry::new();
        let component = if self.connector_component {
            connector::component(&role.server_type)
        } else {
            Vec::new()
        };
        for (name, handler) in component.into_iter().chain(self.handlers) {
            let route = Route::parse(&name).map_err(|source| BootstrapError::HandlerRoute {
                route: name.clone(),
                source,
            })?;
            handlers.register(route, handler)?;
        }

        let acceptors = AcceptorSet::bind(&self.acceptors, self.options).await?;
        let local_addrs = acceptors.local_addrs();

        tracing::info!(
            server_type = %role.server_type,
            frontend = role.frontend,
            metadata = ?role.metadata,
            "Server role declared"
        );

        let context = Arc::new(FrontendContext::new(
            dictionary,
            strategies,
            handlers,
            self.discovery,
            self.forwarder,
            role,
        ));
        let (incoming, closer) = acceptors.listen();

        Ok(Frontend {
            context,
            incoming,
            closer,
            local_addrs,
        })
    }
}

/// A started node: router frozen, acceptors bound and listening.
#[derive(Debug)]
pub struct Frontend {
    context: Arc<FrontendContext>,
    incoming: Incoming,
    closer: AcceptorCloser,
    local_addrs: Vec<SocketAddr>,
}

impl Frontend {
    pub fn context(&self) -> &Arc<FrontendContext> {
        &self.context
    }

    /// Bound addresses, in acceptor order.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Handle that stops accepting; `run` returns once it fires.
    pub fn closer(&self) -> AcceptorCloser {
        self.closer.clone()
    }

    /// Accept until `shutdown` triggers.
    pub fn run(self, shutdown: &Shutdown) -> impl Future<Output = ()> + Send + 'static {
        let mut signal = shutdown.subscribe();
        self.run_until(async move { signal.recv().await })
    }

    /// Accept until `signal` resolves or the acceptors are closed.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until<F>(self, signal: F)
    where
        F: Future<Output = ()> + Send,
    {
        let Frontend {
            context,
            mut incoming,
            closer,
            local_addrs,
        } = self;

        if local_addrs.is_empty() {
            tracing::info!(server_type = %context.role().server_type, "No acceptors; waiting for shutdown");
            signal.await;
            closer.close();
            return;
        }

        tracing::info!(addresses = ?local_addrs, "Accepting connections");
        tokio::pin!(signal);
        loop {
            tokio::select! {
                _ = &mut signal => break,
                next = incoming.next() => match next {
                    Some(connection) => {
                        tokio::spawn(serve_connection(context.clone(), connection));
                    }
                    None => break,
                },
            }
        }

        closer.close();
        tracing::info!("Stopped accepting connections");
    }
}
