//! # Router Module
//!
//! Binds user handlers to OpenAPI operations and matches inbound requests to them.
//!
//! ## Overview
//!
//! - [`PathMatcher`] compiles one path template (e.g. `/greet/{lang}`) into a regex
//!   under the server base path and extracts path parameters.
//! - [`OpenApiRoute`] resolves a [`RouteDescriptor`](crate::ids::RouteDescriptor)
//!   (operation id, or path + method) against the spec and wraps the handler so every
//!   inbound request is validated before it runs.
//! - [`OpenApiRouter`] keys routes by route id, rejects duplicates and dispatches
//!   `http::Request`s to the matching route.
//!
//! ## Example
//!
//! ```rust,ignore
//! use apiprimed::ids::RouteDescriptor;
//! use apiprimed::router::OpenApiRouter;
//!
//! let mut router = OpenApiRouter::from_path("openapi.yaml")?;
//! router.add_route(greet, RouteDescriptor::operation_id("greetPost"))?;
//! let response = router.dispatch(request).await?;
//! ```
//!
//! Resolution happens once, at registration. A route whose operation id or path is not
//! declared fails then rather than on the first request.

mod core;
mod matcher;
mod route;
#[cfg(test)]
mod tests;

pub use core::OpenApiRouter;
pub use matcher::PathMatcher;
pub use route::OpenApiRoute;
