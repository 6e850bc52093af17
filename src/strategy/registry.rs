//! Strategy registry and route resolution.
//!
//! # Responsibilities
//! - Bind at most one strategy per service name
//! - Resolve a route to exactly one server from a candidate snapshot
//! - Apply the default policy when no strategy is bound or it makes no decision

use std::collections::HashMap;

use thiserror::Error;

use crate::cluster::{CandidatePool, ServerDescriptor};
use crate::observability::metrics;
use crate::routing::route::is_identifier;
use crate::strategy::{LowestId, RouteContext, RouteStrategy};

/// Metric label for services with no strategy and no candidates.
const UNKNOWN_SERVICE_LABEL: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("a strategy is already registered for service {service:?}")]
    StrategyExists { service: String },

    #[error("invalid service name {service:?}")]
    InvalidServiceName { service: String },

    #[error("no server available for service {service:?}")]
    NoServerAvailable { service: String },
}

/// Maps service names to their selection strategy.
///
/// Mutated only while bootstrapping (`register` takes `&mut self`); shared
/// read-only behind an `Arc` once the frontend runs.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Box<dyn RouteStrategy>>,
    fallback: LowestId,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `strategy` to `service`. Fails if the service already has one; the
    /// existing strategy stays active.
    pub fn register<S>(&mut self, service: impl Into<String>, strategy: S) -> Result<(), RoutingError>
    where
        S: RouteStrategy + 'static,
    {
        self.register_boxed(service, Box::new(strategy))
    }

    pub fn register_boxed(
        &mut self,
        service: impl Into<String>,
        strategy: Box<dyn RouteStrategy>,
    ) -> Result<(), RoutingError> {
        let service = service.into();
        if !is_identifier(&service) {
            return Err(RoutingError::InvalidServiceName { service });
        }
        if self.strategies.contains_key(&service) {
            return Err(RoutingError::StrategyExists { service });
        }

        tracing::debug!(service = %service, strategy = strategy.name(), "Route strategy registered");
        self.strategies.insert(service, strategy);
        Ok(())
    }

    pub fn contains(&self, service: &str) -> bool {
        self.strategies.contains_key(service)
    }

    /// Name of the strategy bound to `service`, if any.
    pub fn strategy_name(&self, service: &str) -> Option<&'static str> {
        self.strategies.get(service).map(|s| s.name())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Pick the server for `ctx.route` from `pool`.
    ///
    /// An empty pool always fails; strategies never see zero candidates.
    pub fn resolve<'p>(
        &self,
        ctx: &RouteContext<'_>,
        pool: &'p CandidatePool,
    ) -> Result<&'p ServerDescriptor, RoutingError> {
        let service = ctx.route.service();

        if pool.is_empty() {
            tracing::debug!(route = %ctx.route, "No candidates for service");
            metrics::record_route_decision(self.service_label(service, pool), "unavailable");
            return Err(RoutingError::NoServerAvailable {
                service: service.to_string(),
            });
        }

        if let Some(strategy) = self.strategies.get(service) {
            match strategy.select(ctx, pool) {
                Some(server) if pool.contains(&server.id) => {
                    tracing::debug!(
                        route = %ctx.route,
                        strategy = strategy.name(),
                        server_id = %server.id,
                        "Route resolved"
                    );
                    metrics::record_route_decision(service, "strategy");
                    return Ok(server);
                }
                Some(server) => {
                    tracing::warn!(
                        route = %ctx.route,
                        strategy = strategy.name(),
                        server_id = %server.id,
                        "Strategy picked a server outside the pool; using default policy"
                    );
                }
                None => {
                    tracing::debug!(route = %ctx.route, strategy = strategy.name(), "Strategy made no decision");
                }
            }
        }

        self.fallback(ctx, pool)
    }

    /// Apply the default policy (lowest server id).
    pub fn fallback<'p>(
        &self,
        ctx: &RouteContext<'_>,
        pool: &'p CandidatePool,
    ) -> Result<&'p ServerDescriptor, RoutingError> {
        let service = ctx.route.service();
        match self.fallback.select(ctx, pool) {
            Some(server) => {
                tracing::debug!(route = %ctx.route, server_id = %server.id, "Route resolved by default policy");
                metrics::record_route_decision(self.service_label(service, pool), "fallback");
                Ok(server)
            }
            None => {
                metrics::record_route_decision(self.service_label(service, pool), "unavailable");
                Err(RoutingError::NoServerAvailable {
                    service: service.to_string(),
                })
            }
        }
    }

    /// Service names reach metric labels only when configured or discovered.
    fn service_label<'s>(&self, service: &'s str, pool: &CandidatePool) -> &'s str {
        if self.strategies.contains_key(service) || !pool.is_empty() {
            service
        } else {
            UNKNOWN_SERVICE_LABEL
        }
    }
}
