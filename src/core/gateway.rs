//! Composition root and request pipeline.
//!
//! [`GatewayStores`] owns exactly one instance of every store; it is shared by
//! `Arc` between the request pipeline and whatever applies configuration
//! events. [`GatewayService`] chains the stores for one inbound request:
//!
//! 1. route by (path, host)
//! 2. resolve the credential value to its record
//! 3. authorize the method through the route's binding
//! 4. enforce the credential's rate
//! 5. publish a traffic point, then answer from a mock target or forward
//!
//! Nothing here performs I/O; every step is a short synchronous store read.
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    config::{MockRoute, Route, TrafficPoint},
    core::{
        credential_store::CredentialStore, mock_store::MockRouteStore,
        permission_store::PermissionStore, rate_limiter::RateLimiter, route_store::RouteStore,
    },
    ports::TrafficPublisher,
    tracing_setup::create_request_span,
};

/// One instance of every store, each behind its own lock.
#[derive(Debug, Default)]
pub struct GatewayStores {
    pub routes: RouteStore,
    pub permissions: PermissionStore,
    pub credentials: CredentialStore,
    pub mocks: MockRouteStore,
    pub traffic: Arc<RateLimiter>,
}

impl GatewayStores {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The parts of an inbound request the pipeline looks at.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub path: &'a str,
    /// Virtual host; `None` targets global routes only
    pub host: Option<&'a str>,
    pub method: &'a str,
    /// Plaintext credential value presented by the caller
    pub credential: Option<&'a str>,
}

/// Outcome of running one request through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No route, or no mock route for a mock-backed route
    NotFound,
    /// Protected route and the credential is missing or unknown
    Unauthorized,
    /// The credential is known but not allowed this method on this path
    Forbidden,
    /// The credential's rate is exhausted
    RateLimited,
    /// Answer with a canned response
    Mock(Arc<MockRoute>),
    /// Forward upstream with the rewritten path
    Forward {
        route: Arc<Route>,
        upstream_path: String,
    },
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::NotFound => "not_found",
            Decision::Unauthorized => "unauthorized",
            Decision::Forbidden => "forbidden",
            Decision::RateLimited => "rate_limited",
            Decision::Mock(_) => "mock",
            Decision::Forward { .. } => "forward",
        }
    }
}

/// Request pipeline over a shared [`GatewayStores`].
#[derive(Clone)]
pub struct GatewayService {
    stores: Arc<GatewayStores>,
    traffic: Arc<dyn TrafficPublisher>,
}

impl GatewayService {
    /// Create a pipeline that publishes accepted traffic through `traffic`.
    pub fn new(stores: Arc<GatewayStores>, traffic: Arc<dyn TrafficPublisher>) -> Self {
        Self { stores, traffic }
    }

    pub fn stores(&self) -> &Arc<GatewayStores> {
        &self.stores
    }

    /// Run `request` through routing, authorization and rate limiting.
    pub fn handle(&self, request: &InboundRequest<'_>, now: DateTime<Utc>) -> Decision {
        let host = request.host.unwrap_or("");
        let span = create_request_span(request.method, request.path, host);
        let _entered = span.enter();

        let decision = self.decide(request, host, now);
        span.record("decision", decision.as_str());
        tracing::debug!(decision = decision.as_str(), "request resolved");
        decision
    }

    fn decide(&self, request: &InboundRequest<'_>, host: &str, now: DateTime<Utc>) -> Decision {
        let Some(route) = self.stores.routes.get(request.path, host) else {
            return Decision::NotFound;
        };
        let upstream_path = route.upstream_path(request.path);

        let credential_name = match route.binding.as_deref() {
            None => None,
            Some(binding) => match self.authorize(&route, binding, request, &upstream_path, now) {
                Ok(name) => Some(name),
                Err(denied) => return denied,
            },
        };

        if let Some(credential_name) = credential_name {
            self.traffic.publish(TrafficPoint {
                namespace: route.namespace.clone(),
                route_name: route.name.clone(),
                credential_name,
                timestamp: now,
            });
        }

        if route.mock {
            return match self.stores.mocks.get(
                &route.namespace,
                &route.target_backend,
                &upstream_path,
                request.method,
            ) {
                Some(mock) => Decision::Mock(mock),
                None => Decision::NotFound,
            };
        }

        Decision::Forward {
            route,
            upstream_path,
        }
    }

    /// Resolve and authorize the caller of a protected route, returning the
    /// credential name to attribute traffic to.
    ///
    /// Subpath rules are matched against `upstream_path`, the same rewritten
    /// path mock targets are looked up by.
    fn authorize(
        &self,
        route: &Route,
        binding: &str,
        request: &InboundRequest<'_>,
        upstream_path: &str,
        now: DateTime<Utc>,
    ) -> Result<String, Decision> {
        if !self.stores.permissions.contains(&route.namespace, binding) {
            tracing::debug!(binding, "route binding is not loaded");
            return Err(Decision::Forbidden);
        }

        let record = request
            .credential
            .and_then(|value| self.stores.credentials.get(value))
            .filter(|record| record.namespace == route.namespace)
            .ok_or(Decision::Unauthorized)?;

        let permission = self
            .stores
            .permissions
            .get(&route.namespace, binding, &record.name, upstream_path)
            .ok_or(Decision::Forbidden)?;

        if !permission.rule.authorizes(request.method) {
            return Err(Decision::Forbidden);
        }

        if let Some(rate) = permission.rate {
            if self
                .stores
                .traffic
                .is_violated(route, &rate, &record.name, now)
            {
                return Err(Decision::RateLimited);
            }
        }

        Ok(record.name.clone())
    }
}
