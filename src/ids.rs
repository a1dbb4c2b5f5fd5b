//! Identifiers: per-request ids and route ids.

use crate::error::{Result, RouteIdentificationError};
use crate::method::{cast_http_method, HttpMethod};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Header carrying a caller supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Strongly typed request identifier backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Parse from a header value; if absent or invalid, generate a new one.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.trim().parse::<RequestId>().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(RequestId(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<RequestId>()
            .map_err(|_| serde::de::Error::custom("invalid request id"))
    }
}

/// How a route names its OpenAPI operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteDescriptor {
    /// By `operationId`
    OperationId(String),
    /// By literal path template and method
    PathMethod { path: String, method: HttpMethod },
}

impl RouteDescriptor {
    pub fn operation_id(id: impl Into<String>) -> Self {
        RouteDescriptor::OperationId(id.into())
    }

    pub fn path_method(path: impl Into<String>, method: HttpMethod) -> Self {
        RouteDescriptor::PathMethod {
            path: path.into(),
            method,
        }
    }

    /// Build a descriptor from optional parts.
    ///
    /// The operation id wins when both modes are supplied. A path without a method (or
    /// the reverse) is incomplete.
    ///
    /// # Errors
    ///
    /// [`RouteIdentificationError`] when no mode is complete, or
    /// [`InvalidHttpMethodError`](crate::error::InvalidHttpMethodError) for an unknown
    /// method string.
    pub fn from_parts(
        operation_id: Option<&str>,
        path: Option<&str>,
        method: Option<&str>,
    ) -> Result<Self> {
        if let Some(id) = operation_id {
            return Ok(RouteDescriptor::OperationId(id.to_string()));
        }
        match (path, method) {
            (Some(path), Some(method)) => Ok(RouteDescriptor::PathMethod {
                path: path.to_string(),
                method: cast_http_method(method)?,
            }),
            _ => Err(RouteIdentificationError.into()),
        }
    }

    /// Registry key for this descriptor.
    #[must_use]
    pub fn route_id(&self) -> String {
        match self {
            RouteDescriptor::OperationId(id) => id.clone(),
            RouteDescriptor::PathMethod { path, method } => path_route_id(path, *method),
        }
    }
}

impl Display for RouteDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteDescriptor::OperationId(id) => write!(f, "operationId={id}"),
            RouteDescriptor::PathMethod { path, method } => {
                write!(f, "{} {path}", method.as_str().to_ascii_uppercase())
            }
        }
    }
}

/// Derive a route id from an operation id, or from a path and method.
///
/// `"/greet/{lang}"` with `"post"` gives `"post.greet.lang"`. An operation id is returned
/// verbatim.
///
/// # Errors
///
/// Fails with a routing error when neither an operation id nor a complete path and
/// method pair is supplied, and with an invalid method error for unknown methods.
pub fn generate_route_id(
    operation_id: Option<&str>,
    path: Option<&str>,
    method: Option<&str>,
) -> Result<String> {
    RouteDescriptor::from_parts(operation_id, path, method).map(|d| d.route_id())
}

fn path_route_id(path: &str, method: HttpMethod) -> String {
    let slug = path
        .to_ascii_lowercase()
        .replace(['{', '}'], "")
        .replace('/', ".");
    let slug = slug.trim_matches('.');
    if slug.is_empty() {
        method.as_str().to_string()
    } else {
        format!("{}.{slug}", method.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_id_from_path_and_method() {
        let id = generate_route_id(None, Some("/greet/{lang}"), Some("post")).unwrap();
        assert_eq!(id, "post.greet.lang");
    }

    #[test]
    fn test_route_id_from_operation_id_is_verbatim() {
        let id = generate_route_id(Some("greetPost"), None, None).unwrap();
        assert_eq!(id, "greetPost");
        let id = generate_route_id(Some("greetPost"), Some("/x"), Some("get")).unwrap();
        assert_eq!(id, "greetPost");
    }

    #[test]
    fn test_route_id_requires_identification() {
        let err = generate_route_id(None, None, None).unwrap_err();
        assert!(err.is_route_identification_error());
        let err = generate_route_id(None, Some("/greet"), None).unwrap_err();
        assert!(err.is_route_identification_error());
        let err = generate_route_id(None, None, Some("get")).unwrap_err();
        assert!(err.is_routing_error());
    }

    #[test]
    fn test_route_id_rejects_unknown_method() {
        let err = generate_route_id(None, Some("/greet"), Some("fetch")).unwrap_err();
        assert!(matches!(err, crate::error::Error::InvalidHttpMethod(_)));
    }

    #[test]
    fn test_route_id_for_root_and_case() {
        assert_eq!(path_route_id("/", HttpMethod::Get), "get");
        assert_eq!(path_route_id("/Users/{userId}/", HttpMethod::Delete), "delete.users.userid");
    }

    #[test]
    fn test_request_id_from_header() {
        let id = RequestId::new();
        let parsed = RequestId::from_header_or_new(Some(&id.to_string()));
        assert_eq!(parsed, id);
        let fresh = RequestId::from_header_or_new(Some("not-a-ulid"));
        assert_ne!(fresh, id);
    }

    #[test]
    fn test_request_id_serde() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
