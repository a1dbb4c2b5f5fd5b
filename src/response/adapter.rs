use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use serde_json::Value;

/// An outgoing response in the shape the validator works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenApiResponse {
    pub status: u16,
    /// Declared `Content-Type`, `None` when absent
    pub mimetype: Option<String>,
    pub data: Bytes,
}

impl OpenApiResponse {
    /// Capture status, content type and body of an `http::Response`.
    #[must_use]
    pub fn from_http(response: &Response<Bytes>) -> Self {
        OpenApiResponse {
            status: response.status().as_u16(),
            mimetype: response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            data: response.body().clone(),
        }
    }
}

/// Build an `application/json` response with a compact JSON body.
#[must_use]
pub fn json_response(status: StatusCode, body: &Value) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
