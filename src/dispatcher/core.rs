use crate::error::Result;
use crate::request::{validate_openapi_request, OpenApiRequest, ValidatedRequest};
use crate::spec::{OpenApiSpec, RouteInfo};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use http::Response;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

/// A user handler taking a validated request.
///
/// Implemented for every `Fn(ValidatedRequest) -> impl Future<Output = Response<Bytes>>`
/// that is `Send + Sync + 'static`, so plain async functions and closures qualify.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: ValidatedRequest) -> BoxFuture<'static, Response<Bytes>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(ValidatedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Bytes>> + Send + 'static,
{
    fn call(&self, request: ValidatedRequest) -> BoxFuture<'static, Response<Bytes>> {
        self(request).boxed()
    }
}

/// A handler composed with fail-fast request validation.
///
/// Built once at registration. Each call validates the adapted request against the
/// operation this handler was registered for, invokes the inner handler with the
/// [`ValidatedRequest`] and returns its response untouched.
#[derive(Clone)]
pub struct ValidatedHandler {
    spec: Arc<OpenApiSpec>,
    route: RouteInfo,
    route_id: String,
    inner: Arc<dyn Handler>,
}

impl ValidatedHandler {
    pub fn new(
        inner: Arc<dyn Handler>,
        spec: Arc<OpenApiSpec>,
        route: RouteInfo,
        route_id: impl Into<String>,
    ) -> Self {
        Self {
            spec,
            route,
            route_id: route_id.into(),
            inner,
        }
    }

    #[must_use]
    pub fn route(&self) -> &RouteInfo {
        &self.route
    }

    /// Validate `request` and run the inner handler.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`](crate::error::Error::Validation) when the request violates
    /// the operation; the inner handler is not called in that case.
    pub async fn call(&self, request: OpenApiRequest) -> Result<Response<Bytes>> {
        let span = info_span!(
            "validated_call",
            request_id = %request.request_id,
            route_id = %self.route_id,
            route = %self.route
        );
        async move {
            let request = request.with_route(self.route.clone());
            let validated = match validate_openapi_request(request, &self.spec) {
                Ok(validated) => validated,
                Err(err) => {
                    warn!(error = %err, "Request rejected");
                    return Err(err);
                }
            };

            let started = Instant::now();
            let response = self.inner.call(validated).await;
            info!(
                status = response.status().as_u16(),
                duration_us = started.elapsed().as_micros() as u64,
                "Handler completed"
            );
            Ok(response)
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for ValidatedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedHandler")
            .field("route", &self.route)
            .field("route_id", &self.route_id)
            .finish_non_exhaustive()
    }
}
