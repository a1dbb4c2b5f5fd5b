//! # Application
//!
//! [`ApiPrimed`] ties a loaded spec, an [`OpenApiRouter`] and a [`RuntimeConfig`]
//! together. Hosts hand it `http::Request`s and get `http::Response<Bytes>` back; request
//! validation always runs, response validation only when
//! [`RuntimeConfig::validate_responses`] is set.
//!
//! ```rust,ignore
//! use apiprimed::app::ApiPrimed;
//! use apiprimed::ids::RouteDescriptor;
//! use apiprimed::runtime_config::RuntimeConfig;
//!
//! let mut app = ApiPrimed::new("openapi.yaml", RuntimeConfig::from_env())?;
//! app.add_route(greet, RouteDescriptor::operation_id("greetPost"))?;
//! let response = app.handle(request).await?;
//! ```

use crate::dispatcher::Handler;
use crate::error::{Result, RoutingError};
use crate::ids::RouteDescriptor;
use crate::request::OpenApiRequest;
use crate::response::validate_openapi_response;
use crate::router::{OpenApiRoute, OpenApiRouter};
use crate::runtime_config::RuntimeConfig;
use crate::spec::OpenApiSpec;
use bytes::Bytes;
use http::{Request, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Where the application's OpenAPI document comes from.
#[derive(Debug, Clone)]
pub enum SpecSource {
    /// A YAML or JSON file, loaded with the configured compile options
    Path(PathBuf),
    /// A document already loaded and shared
    Loaded(Arc<OpenApiSpec>),
}

impl From<PathBuf> for SpecSource {
    fn from(path: PathBuf) -> Self {
        SpecSource::Path(path)
    }
}

impl From<&Path> for SpecSource {
    fn from(path: &Path) -> Self {
        SpecSource::Path(path.to_path_buf())
    }
}

impl From<&str> for SpecSource {
    fn from(path: &str) -> Self {
        SpecSource::Path(PathBuf::from(path))
    }
}

impl From<Arc<OpenApiSpec>> for SpecSource {
    fn from(spec: Arc<OpenApiSpec>) -> Self {
        SpecSource::Loaded(spec)
    }
}

impl From<OpenApiSpec> for SpecSource {
    fn from(spec: OpenApiSpec) -> Self {
        SpecSource::Loaded(Arc::new(spec))
    }
}

#[derive(Debug, Clone)]
pub struct ApiPrimed {
    router: OpenApiRouter,
    config: RuntimeConfig,
}

impl ApiPrimed {
    /// # Errors
    ///
    /// [`Error::SpecLoad`](crate::error::Error::SpecLoad) when a document path cannot be
    /// loaded.
    pub fn new(source: impl Into<SpecSource>, config: RuntimeConfig) -> Result<Self> {
        let spec = match source.into() {
            SpecSource::Path(path) => {
                Arc::new(OpenApiSpec::from_path_with_options(&path, &config.compile_options())?)
            }
            SpecSource::Loaded(spec) => spec,
        };
        info!(
            title = %spec.title().unwrap_or_default(),
            max_body_bytes = config.max_body_bytes,
            validate_responses = config.validate_responses,
            "Application created"
        );
        let router = OpenApiRouter::new(spec).with_max_body_bytes(config.max_body_bytes);
        Ok(Self { router, config })
    }

    #[must_use]
    pub fn spec(&self) -> &Arc<OpenApiSpec> {
        self.router.spec()
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn router(&self) -> &OpenApiRouter {
        &self.router
    }

    /// Register `handler` for the operation `descriptor` names.
    ///
    /// # Errors
    ///
    /// See [`OpenApiRouter::add_route`].
    pub fn add_route<H: Handler>(
        &mut self,
        handler: H,
        descriptor: RouteDescriptor,
    ) -> Result<&OpenApiRoute> {
        self.router.add_route(handler, descriptor)
    }

    /// Route, validate and handle one request.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::NoRoute`] when no registered route matches
    /// - [`Error::Body`](crate::error::Error::Body) when the body cannot be read
    /// - [`Error::Validation`](crate::error::Error::Validation) for an invalid request, or
    ///   an invalid response when response validation is enabled
    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<Bytes>>
    where
        B: http_body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if !self.config.validate_responses {
            return self.router.dispatch(req).await;
        }

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let Some((route, path_params)) = self.router.route(&method, &path) else {
            return Err(RoutingError::NoRoute {
                method: method.to_string(),
                path,
            }
            .into());
        };

        let request = OpenApiRequest::from_http(req, path_params, self.config.max_body_bytes)
            .await?
            .with_route(route.route_info().clone());
        let response = route.call(request.clone()).await?;

        validate_openapi_response(&response, &request, self.spec()).inspect_err(|err| {
            warn!(
                request_id = %request.request_id,
                route_id = %route.route_id(),
                error = %err,
                "Response rejected"
            );
        })
    }
}
