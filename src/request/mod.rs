//! # Request Adaptation and Validation
//!
//! Inbound flow: an `http::Request` is adapted into an [`OpenApiRequest`] (body read
//! once, parameters bucketed by location), then validated against the compiled spec.
//!
//! - [`RequestValidator::validate`] collects every issue and never fails.
//! - [`validate_request`] adapts and validates in one step and fails fast with
//!   [`ValidationErrors`](crate::validator::ValidationErrors).

mod adapter;
mod validator;

pub use adapter::{parse_cookies, parse_query_params, OpenApiRequest, RequestParameters};
pub use validator::{
    validate_openapi_request, RequestValidationResult, RequestValidator, ValidatedParameters,
    ValidatedRequest,
};

use crate::error::Result;
use crate::runtime_config::DEFAULT_MAX_BODY_BYTES;
use crate::spec::OpenApiSpec;
use bytes::Bytes;
use http::Request;
use std::collections::HashMap;

/// Adapt and validate an inbound request in one step.
///
/// `path_params` are the values the host router extracted; they take precedence over
/// values matched from the URL. The body is limited to the default maximum size.
///
/// # Errors
///
/// [`Error::Body`](crate::error::Error::Body) when the body cannot be read, and
/// [`Error::Validation`](crate::error::Error::Validation) with every issue found.
pub async fn validate_request<B>(
    req: Request<B>,
    path_params: HashMap<String, String>,
    spec: &OpenApiSpec,
) -> Result<ValidatedRequest>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let request = OpenApiRequest::from_http(req, path_params, DEFAULT_MAX_BODY_BYTES).await?;
    validate_openapi_request(request, spec)
}
