//! HTTP methods an OpenAPI path item may declare.
//!
//! OpenAPI only knows eight operation keys under a path item. [`HttpMethod`] is that
//! closed set; anything else is rejected with an [`InvalidHttpMethodError`] that lists
//! the accepted values.

use crate::error::InvalidHttpMethodError;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// An HTTP method supported by OpenAPI path items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Trace,
    Patch,
}

impl HttpMethod {
    /// Every method in declaration order.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Head,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Trace,
        HttpMethod::Patch,
    ];

    /// The lowercase key used for this method inside an OpenAPI path item.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Head => "head",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
            HttpMethod::Patch => "patch",
        }
    }

    /// Lowercase names of all supported methods.
    #[must_use]
    pub fn expected_values() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }

    /// Convert into the `http` crate representation.
    #[must_use]
    pub fn to_http(self) -> http::Method {
        match self {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Options => http::Method::OPTIONS,
            HttpMethod::Trace => http::Method::TRACE,
            HttpMethod::Patch => http::Method::PATCH,
        }
    }
}

/// Cast a free-form method string into an [`HttpMethod`], ignoring case.
///
/// # Errors
///
/// Returns [`InvalidHttpMethodError`] when the string names no OpenAPI method.
pub fn cast_http_method(method: &str) -> Result<HttpMethod, InvalidHttpMethodError> {
    method.parse()
}

impl FromStr for HttpMethod {
    type Err = InvalidHttpMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        HttpMethod::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == lowered)
            .ok_or_else(|| InvalidHttpMethodError::new(lowered, HttpMethod::expected_values()))
    }
}

impl TryFrom<&http::Method> for HttpMethod {
    type Error = InvalidHttpMethodError;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        method.to_http()
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_is_case_insensitive() {
        assert_eq!(cast_http_method("POST").unwrap(), HttpMethod::Post);
        assert_eq!(cast_http_method("post").unwrap(), HttpMethod::Post);
        assert_eq!(cast_http_method("Patch").unwrap(), HttpMethod::Patch);
        assert_eq!(cast_http_method(" get ").unwrap(), HttpMethod::Get);
    }

    #[test]
    fn test_cast_rejects_unknown_method() {
        let err = cast_http_method("CONNECT").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'connect'"));
        assert!(msg.contains("get,head,post,put,delete,options,trace,patch"));
    }

    #[test]
    fn test_http_conversion_round_trip() {
        for m in HttpMethod::ALL {
            let http_method = m.to_http();
            assert_eq!(HttpMethod::try_from(&http_method).unwrap(), m);
        }
        assert!(HttpMethod::try_from(&http::Method::CONNECT).is_err());
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(HttpMethod::Delete.to_string(), "delete");
    }
}
