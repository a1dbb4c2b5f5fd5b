use super::matcher::PathMatcher;
use crate::dispatcher::{Handler, ValidatedHandler};
use crate::error::{Result, RoutingError};
use crate::ids::RouteDescriptor;
use crate::method::HttpMethod;
use crate::request::OpenApiRequest;
use crate::spec::{OpenApiSpec, RouteInfo};
use bytes::Bytes;
use http::{Method, Request, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A handler bound to one OpenAPI operation.
///
/// Construction resolves the [`RouteDescriptor`] against the spec and wraps the handler
/// in a [`ValidatedHandler`]. Inbound requests are validated before the handler runs; the
/// handler's response is returned untouched.
#[derive(Debug, Clone)]
pub struct OpenApiRoute {
    route_id: String,
    info: RouteInfo,
    operation_id: Option<String>,
    matcher: PathMatcher,
    handler: ValidatedHandler,
}

impl OpenApiRoute {
    /// Resolve `descriptor` and bind `handler` to the operation it names.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::OperationNotFound`] for an undeclared operation id
    /// - [`RoutingError::PathNotFound`] when `paths[path][method]` is not declared
    pub fn new<H: Handler>(
        handler: H,
        spec: Arc<OpenApiSpec>,
        descriptor: RouteDescriptor,
    ) -> Result<Self> {
        let info = match &descriptor {
            RouteDescriptor::OperationId(id) => spec.lookup_by_operation_id(id).ok_or_else(|| {
                RoutingError::OperationNotFound {
                    operation_id: id.clone(),
                }
            })?,
            RouteDescriptor::PathMethod { path, method } => {
                if !spec.has_operation(path, *method) {
                    return Err(path_not_found(path, *method).into());
                }
                RouteInfo {
                    path: path.clone(),
                    method: *method,
                }
            }
        };

        let operation = spec
            .compiled()
            .operation(&info.path, info.method)
            .ok_or_else(|| path_not_found(&info.path, info.method))?;
        let operation_id = operation.operation_id.clone();
        let matcher = operation.matcher.clone();
        let route_id = descriptor.route_id();

        debug!(
            route_id = %route_id,
            route = %info,
            descriptor = %descriptor,
            "Route resolved"
        );

        let handler = ValidatedHandler::new(Arc::new(handler), spec, info.clone(), route_id.clone());
        Ok(Self {
            route_id,
            info,
            operation_id,
            matcher,
            handler,
        })
    }

    /// The OpenAPI path template, e.g. `/greet/{lang}`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.info.path
    }

    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.info.method
    }

    /// Methods this route answers; always exactly one.
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        vec![self.info.method.to_http()]
    }

    /// `operationId` of the bound operation, if the document declares one.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Registry key: the operation id or the slug derived from path and method.
    #[must_use]
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    #[must_use]
    pub fn route_info(&self) -> &RouteInfo {
        &self.info
    }

    #[must_use]
    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    /// Routes never add themselves to generated schemas; the document already describes
    /// them.
    #[must_use]
    pub fn include_in_schema(&self) -> bool {
        false
    }

    /// Match an inbound method and URL path, returning the path parameters.
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> Option<HashMap<String, String>> {
        match HttpMethod::try_from(method) {
            Ok(m) if m == self.info.method => self.matcher.matches(path),
            _ => None,
        }
    }

    /// Adapt `req`, validate it and run the handler.
    ///
    /// # Errors
    ///
    /// [`Error::Body`](crate::error::Error::Body) when the body cannot be read and
    /// [`Error::Validation`](crate::error::Error::Validation) when the request is invalid.
    pub async fn handle<B>(
        &self,
        req: Request<B>,
        path_params: HashMap<String, String>,
        max_body_bytes: usize,
    ) -> Result<Response<Bytes>>
    where
        B: http_body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request = OpenApiRequest::from_http(req, path_params, max_body_bytes).await?;
        self.call(request).await
    }

    /// Validate an already adapted request and run the handler.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`](crate::error::Error::Validation) when the request is invalid.
    pub async fn call(&self, request: OpenApiRequest) -> Result<Response<Bytes>> {
        self.handler.call(request).await
    }
}

fn path_not_found(path: &str, method: HttpMethod) -> RoutingError {
    RoutingError::PathNotFound {
        path: path.to_string(),
        method: method.to_string(),
    }
}
