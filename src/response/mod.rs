//! # Response Adaptation and Validation
//!
//! The mirror image of [`crate::request`]: an outgoing `http::Response<Bytes>` is
//! captured as an [`OpenApiResponse`] and checked against the responses declared for the
//! operation its request resolved to. The declared response is selected by exact status
//! code, then by `NXX` range, then `default`.

mod adapter;
mod validator;

pub use adapter::{json_response, OpenApiResponse};
pub use validator::{
    validate_openapi_response, validate_response, ResponseValidationResult, ResponseValidator,
};
