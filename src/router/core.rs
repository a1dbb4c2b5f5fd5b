use super::route::OpenApiRoute;
use crate::dispatcher::Handler;
use crate::error::{Result, RoutingError};
use crate::ids::RouteDescriptor;
use crate::runtime_config::DEFAULT_MAX_BODY_BYTES;
use crate::spec::OpenApiSpec;
use bytes::Bytes;
use http::{Method, Request, Response};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Registry of [`OpenApiRoute`]s keyed by route id.
///
/// Routes are kept in registration order. Matching tries routes with literal templates
/// before templated ones, so `/pets/mine` wins over `/pets/{id}`.
#[derive(Debug, Clone)]
pub struct OpenApiRouter {
    spec: Arc<OpenApiSpec>,
    routes: Vec<OpenApiRoute>,
    index: HashMap<String, usize>,
    max_body_bytes: usize,
}

impl OpenApiRouter {
    #[must_use]
    pub fn new(spec: Arc<OpenApiSpec>) -> Self {
        Self {
            spec,
            routes: Vec::new(),
            index: HashMap::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Load the document at `path` and create an empty router for it.
    ///
    /// # Errors
    ///
    /// [`Error::SpecLoad`](crate::error::Error::SpecLoad) when the document cannot be
    /// loaded.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let spec = OpenApiSpec::from_path(path)?;
        Ok(Self::new(Arc::new(spec)))
    }

    /// Largest request body [`OpenApiRouter::dispatch`] reads.
    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub fn spec(&self) -> &Arc<OpenApiSpec> {
        &self.spec
    }

    /// Bind `handler` to the operation `descriptor` names.
    ///
    /// # Errors
    ///
    /// [`RoutingError::DuplicateRoute`] when the route id is taken or the operation is
    /// already bound under another route id, or any resolution
    /// error from [`OpenApiRoute::new`].
    pub fn add_route<H: Handler>(
        &mut self,
        handler: H,
        descriptor: RouteDescriptor,
    ) -> Result<&OpenApiRoute> {
        let route_id = descriptor.route_id();
        if self.index.contains_key(&route_id) {
            warn!(route_id = %route_id, "Route id already registered");
            return Err(RoutingError::DuplicateRoute { route_id }.into());
        }

        let route = OpenApiRoute::new(handler, Arc::clone(&self.spec), descriptor)?;
        if let Some(existing) = self
            .routes
            .iter()
            .find(|r| r.route_info() == route.route_info())
        {
            warn!(
                route_id = %route_id,
                existing_route_id = %existing.route_id(),
                route = %route.route_info(),
                "Operation already registered"
            );
            return Err(RoutingError::DuplicateRoute {
                route_id: existing.route_id().to_string(),
            }
            .into());
        }
        info!(
            route_id = %route.route_id(),
            method = %route.method(),
            path = %route.path(),
            operation_id = ?route.operation_id(),
            routes_count = self.routes.len() + 1,
            "Route registered"
        );

        let position = self.routes.len();
        self.index.insert(route_id, position);
        self.routes.push(route);
        Ok(&self.routes[position])
    }

    /// Registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[OpenApiRoute] {
        &self.routes
    }

    #[must_use]
    pub fn get(&self, route_id: &str) -> Option<&OpenApiRoute> {
        self.index.get(route_id).map(|&i| &self.routes[i])
    }

    /// Find the route for an inbound method and URL path.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<(&OpenApiRoute, HashMap<String, String>)> {
        debug!(method = %method, path = %path, "Route match attempt");
        let started = Instant::now();

        let found = self
            .routes
            .iter()
            .filter(|r| r.matcher().is_literal())
            .chain(self.routes.iter().filter(|r| !r.matcher().is_literal()))
            .find_map(|r| r.matches(method, path).map(|params| (r, params)));

        let elapsed = started.elapsed();
        match &found {
            Some((route, params)) if elapsed > Duration::from_millis(1) => warn!(
                method = %method,
                path = %path,
                route_id = %route.route_id(),
                path_params = ?params,
                duration_us = elapsed.as_micros() as u64,
                "Slow route matching detected"
            ),
            Some((route, params)) => info!(
                method = %method,
                path = %path,
                route_id = %route.route_id(),
                route_pattern = %route.path(),
                path_params = ?params,
                duration_us = elapsed.as_micros() as u64,
                "Route matched"
            ),
            None => debug!(
                method = %method,
                path = %path,
                duration_us = elapsed.as_micros() as u64,
                "No route matched"
            ),
        }
        found
    }

    /// Route `req`, validate it and run the matching handler.
    ///
    /// # Errors
    ///
    /// [`RoutingError::NoRoute`] when nothing matches, otherwise whatever
    /// [`OpenApiRoute::handle`] fails with.
    pub async fn dispatch<B>(&self, req: Request<B>) -> Result<Response<Bytes>>
    where
        B: http_body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let Some((route, path_params)) = self.route(&method, &path) else {
            return Err(RoutingError::NoRoute {
                method: method.to_string(),
                path,
            }
            .into());
        };
        route.handle(req, path_params, self.max_body_bytes).await
    }
}
