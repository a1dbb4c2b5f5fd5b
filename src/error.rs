//! # Error Handling
//!
//! All fallible operations in the crate return [`Result<T>`] with the [`Error`] sum type.
//!
//! | Variant | Raised when | Phase |
//! |---------|-------------|-------|
//! | [`Error::SpecLoad`] | the OpenAPI document cannot be read, parsed or compiled | startup |
//! | [`Error::Routing`] | a route cannot be identified or has no spec entry | registration |
//! | [`Error::InvalidHttpMethod`] | a method string is not an OpenAPI method | registration |
//! | [`Error::Validation`] | a request or response violates the document | per request |
//! | [`Error::Body`] | the request body stream fails or exceeds the limit | per request |
//!
//! Translating these into HTTP error responses is left to the host; see
//! [`ValidationErrors::to_json`](crate::validator::ValidationErrors::to_json) for a ready
//! made problem body.

use crate::validator::ValidationErrors;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The OpenAPI document could not be loaded.
    #[error(transparent)]
    SpecLoad(#[from] SpecLoadError),

    /// Route identification or resolution failed.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// A method string did not name an OpenAPI method.
    #[error(transparent)]
    InvalidHttpMethod(#[from] InvalidHttpMethodError),

    /// Request or response validation failed (fail-fast mode).
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The request body could not be read.
    #[error("Failed to read request body: {message}")]
    Body {
        /// Reason reported by the body stream or the size limit
        message: String,
    },
}

impl Error {
    /// True for routing failures, including incomplete route identification.
    #[must_use]
    pub fn is_routing_error(&self) -> bool {
        matches!(self, Error::Routing(_))
    }

    /// True when route identification itself was incomplete.
    #[must_use]
    pub fn is_route_identification_error(&self) -> bool {
        matches!(self, Error::Routing(RoutingError::Unidentified(_)))
    }

    /// The aggregated validation issues, if this is a validation failure.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<RouteIdentificationError> for Error {
    fn from(err: RouteIdentificationError) -> Self {
        Error::Routing(RoutingError::Unidentified(err))
    }
}

/// Failures while reading, parsing or compiling an OpenAPI document.
#[derive(Error, Debug)]
pub enum SpecLoadError {
    #[error("Failed to read OpenAPI spec '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse OpenAPI spec as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse OpenAPI spec as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but is not a usable OpenAPI document.
    #[error("Invalid OpenAPI document: {reason}")]
    InvalidDocument { reason: String },

    /// A `$ref` points outside the document or at nothing.
    #[error("Unresolvable reference '{reference}' at {location}")]
    UnresolvedRef { reference: String, location: String },

    /// A schema could not be compiled into a validator.
    #[error("Invalid schema at {location}: {message}")]
    InvalidSchema { location: String, message: String },
}

/// Failures while identifying or resolving a route.
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("No endpoint found with operation ID '{operation_id}'.")]
    OperationNotFound { operation_id: String },

    #[error("Path '{path}' does not exist for method '{method}'.")]
    PathNotFound { path: String, method: String },

    #[error(transparent)]
    Unidentified(#[from] RouteIdentificationError),

    #[error("A route with id '{route_id}' is already registered.")]
    DuplicateRoute { route_id: String },

    /// No registered route matches an inbound request.
    #[error("No route registered for {method} {path}.")]
    NoRoute { method: String, path: String },
}

/// Neither an operation id nor a complete path + method pair was supplied.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error(
    "Route could not be identified. You must either provide the `operation_id` or a combination of `path` and `method`"
)]
pub struct RouteIdentificationError;

/// A string that does not correspond to an HTTP method supported by OpenAPI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "The provided string ('{method}') did not correspond to an HTTP method supported by OpenAPI. Expected one of: {}",
    .expected.join(",")
)]
pub struct InvalidHttpMethodError {
    /// The offending method, lowercased
    pub method: String,
    /// Accepted method names
    pub expected: Vec<&'static str>,
}

impl InvalidHttpMethodError {
    pub fn new(method: impl Into<String>, expected: Vec<&'static str>) -> Self {
        Self {
            method: method.into(),
            expected,
        }
    }
}
