//! # apiprimed
//!
//! **apiprimed** validates HTTP requests and responses against an
//! [OpenAPI 3](https://spec.openapis.org/oas/v3.1.0) document and routes handlers by
//! `operationId` instead of repeating paths and methods in code.
//!
//! ## Overview
//!
//! The host framework (hyper, axum, a test harness) owns the server. apiprimed sits at
//! the `http::Request` / `http::Response<Bytes>` boundary:
//!
//! - register a handler for an operation id, or a literal path + method pair
//! - every inbound request is adapted, its parameters and body casted to the declared
//!   types, defaults filled in and the result validated before the handler runs
//! - handler responses can be validated against the declared responses on request
//!
//! ## Architecture
//!
//! - **[`spec`]** - load YAML/JSON documents, resolve `$ref`s and compile JSON Schema
//!   validators per operation
//! - **[`request`]** - adapt `http::Request`s and validate them
//! - **[`response`]** - adapt `http::Response`s and validate them
//! - **[`router`]** - path matching, [`OpenApiRoute`] and the [`OpenApiRouter`] registry
//! - **[`dispatcher`]** - the [`Handler`] trait and its validating wrapper
//! - **[`app`]** - [`ApiPrimed`], router plus runtime configuration
//! - **[`ids`]** - request ids, route descriptors and route id derivation
//! - **[`validator`]** - validation issues and their aggregation
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as Host server
//!     participant App as ApiPrimed
//!     participant Router as OpenApiRouter
//!     participant Route as OpenApiRoute
//!     participant ReqVal as RequestValidator
//!     participant Handler as Handler
//!     participant RespVal as ResponseValidator
//!
//!     Host->>App: handle(http::Request)
//!     App->>Router: route(method, path)
//!     Router->>Router: literal templates first,<br/>then templated
//!     alt No Route Match
//!         Router-->>Host: RoutingError::NoRoute
//!     end
//!     Router-->>App: (route, path params)
//!     App->>Route: OpenApiRequest::from_http
//!     Route->>ReqVal: validate
//!     ReqVal->>ReqVal: cast params, fill defaults
//!     ReqVal->>ReqVal: decode body, check schema
//!     alt Validation Failed
//!         ReqVal-->>Host: Error::Validation
//!     end
//!     Route->>Handler: call(ValidatedRequest)
//!     Handler-->>Route: http::Response<Bytes>
//!     opt validate_responses
//!         App->>RespVal: validate
//!         RespVal-->>App: re-encoded copy
//!     end
//!     App-->>Host: http::Response<Bytes>
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apiprimed::{ApiPrimed, RouteDescriptor, RuntimeConfig, ValidatedRequest};
//! use apiprimed::response::json_response;
//! use http::StatusCode;
//! use serde_json::json;
//!
//! async fn greet(req: ValidatedRequest) -> http::Response<bytes::Bytes> {
//!     let person = req.body["person"].as_str().unwrap_or("world");
//!     json_response(StatusCode::OK, &json!({ "message": format!("Hello {person}!") }))
//! }
//!
//! let mut app = ApiPrimed::new("openapi.yaml", RuntimeConfig::from_env())?;
//! app.add_route(greet, RouteDescriptor::operation_id("greetPost"))?;
//! let response = app.handle(request).await?;
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`] with [`Error`]. Registration problems
//! (unknown operation id, undeclared path, duplicate route id) surface when routes are
//! added; validation problems per request as [`Error::Validation`], whose
//! [`ValidationErrors::to_json`] renders a `{"error", "details"}` body for host error
//! middleware.

pub mod app;
pub mod cast;
pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod method;
pub mod request;
pub mod response;
pub mod router;
pub mod runtime_config;
pub mod spec;
pub mod validator;

pub use app::{ApiPrimed, SpecSource};
pub use dispatcher::{Handler, ValidatedHandler};
pub use error::{
    Error, InvalidHttpMethodError, Result, RouteIdentificationError, RoutingError, SpecLoadError,
};
pub use ids::{generate_route_id, RequestId, RouteDescriptor};
pub use method::{cast_http_method, HttpMethod};
pub use request::{validate_request, OpenApiRequest, RequestValidator, ValidatedRequest};
pub use response::{validate_response, OpenApiResponse, ResponseValidator};
pub use router::{OpenApiRoute, OpenApiRouter};
pub use runtime_config::RuntimeConfig;
pub use spec::{OpenApiSpec, RouteInfo, SpecFormat};
pub use validator::{IssueKind, ValidationErrors, ValidationIssue};
