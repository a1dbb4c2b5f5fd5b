//! # Dispatcher Module
//!
//! Handler composition. A user handler is any async function from
//! [`ValidatedRequest`](crate::request::ValidatedRequest) to `http::Response<Bytes>`.
//! Registration wraps it in a [`ValidatedHandler`] which validates each inbound request
//! first and only calls the handler with values that passed.
//!
//! ```rust,ignore
//! use apiprimed::request::ValidatedRequest;
//! use apiprimed::response::json_response;
//! use http::StatusCode;
//! use serde_json::json;
//!
//! async fn greet(req: ValidatedRequest) -> http::Response<bytes::Bytes> {
//!     let lang = req.get_path_param("lang").and_then(|v| v.as_str()).unwrap_or("en");
//!     json_response(StatusCode::OK, &json!({ "message": format!("hello in {lang}") }))
//! }
//! ```
//!
//! Response validation is not part of the wrapper; call
//! [`validate_response`](crate::response::validate_response) explicitly or enable it on
//! the [`ApiPrimed`](crate::app::ApiPrimed) application.

mod core;

pub use core::{Handler, ValidatedHandler};
