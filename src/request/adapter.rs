use crate::error::{Error, Result};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::spec::RouteInfo;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST};
use http::{HeaderMap, Request};
use http_body_util::{BodyExt, Limited};
use std::collections::HashMap;
use tracing::{debug, info};

/// Raw request values grouped by where they were found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParameters {
    /// Query values, percent decoded; repeated keys keep every value in order
    pub query: HashMap<String, Vec<String>>,
    /// Header values keyed by lowercase name; repeated headers are joined with `, `
    pub header: HashMap<String, String>,
    /// Path values as extracted by the host router
    pub path: HashMap<String, String>,
    /// Cookies parsed from the `Cookie` header
    pub cookie: HashMap<String, String>,
}

/// An inbound request in the shape the validator works on.
///
/// Produced by [`OpenApiRequest::from_http`]; no validation happens while adapting.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiRequest {
    pub request_id: RequestId,
    /// Absolute URL including query string
    pub full_url: String,
    /// Lowercase method
    pub method: String,
    pub parameters: RequestParameters,
    /// Entire body, read once
    pub body: Bytes,
    /// Declared `Content-Type`, `None` when absent
    pub mimetype: Option<String>,
    /// Operation this request was routed to, when known up front
    pub route: Option<RouteInfo>,
}

impl OpenApiRequest {
    /// Adapt an `http::Request`, reading its body fully into memory.
    ///
    /// # Errors
    ///
    /// [`Error::Body`] when the body stream fails or exceeds `max_body_bytes`.
    pub async fn from_http<B>(
        req: Request<B>,
        path_params: HashMap<String, String>,
        max_body_bytes: usize,
    ) -> Result<Self>
    where
        B: http_body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        if let Some(declared) = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            if declared > max_body_bytes {
                return Err(Error::Body {
                    message: format!(
                        "declared content-length {declared} exceeds limit of {max_body_bytes} bytes"
                    ),
                });
            }
        }

        let body = Limited::new(body, max_body_bytes)
            .collect()
            .await
            .map_err(|e| Error::Body {
                message: e.to_string(),
            })?
            .to_bytes();

        let header = header_map(&parts.headers);
        let cookie = parse_cookies(&header);
        let query = parse_query_params(parts.uri.query());
        let full_url = full_url(&parts.uri, &parts.headers);
        let mimetype = header.get(CONTENT_TYPE.as_str()).cloned();
        let request_id =
            RequestId::from_header_or_new(header.get(REQUEST_ID_HEADER).map(String::as_str));

        debug!(
            request_id = %request_id,
            header_count = header.len(),
            cookie_names = ?cookie.keys().collect::<Vec<_>>(),
            query_param_count = query.len(),
            "Request parts extracted"
        );
        info!(
            request_id = %request_id,
            method = %parts.method,
            url = %full_url,
            body_size_bytes = body.len(),
            content_type = ?mimetype,
            "HTTP request adapted"
        );

        Ok(OpenApiRequest {
            request_id,
            full_url,
            method: parts.method.as_str().to_ascii_lowercase(),
            parameters: RequestParameters {
                query,
                header,
                path: path_params,
                cookie,
            },
            body,
            mimetype,
            route: None,
        })
    }

    /// The path component of [`OpenApiRequest::full_url`], still percent encoded.
    #[must_use]
    pub fn url_path(&self) -> String {
        url::Url::parse(&self.full_url)
            .or_else(|_| url::Url::parse(&format!("http://localhost{}", self.full_url)))
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| {
                self.full_url
                    .split('?')
                    .next()
                    .unwrap_or("/")
                    .to_string()
            })
    }

    /// Attach the operation this request belongs to.
    #[must_use]
    pub fn with_route(mut self, route: RouteInfo) -> Self {
        self.route = Some(route);
        self
    }
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    let mut out: HashMap<String, String> = HashMap::with_capacity(headers.keys_len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).to_string();
        // HTTP/2 may split cookies across fields; they rejoin with the cookie separator.
        let separator = if name == COOKIE { "; " } else { ", " };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

fn full_url(uri: &http::Uri, headers: &HeaderMap) -> String {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return uri.to_string();
    }
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    match headers.get(HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{host}{path_and_query}"),
        None => path_and_query.to_string(),
    }
}

/// Parse the `cookie` header of a lowercase header map.
#[must_use]
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get(COOKIE.as_str())
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a raw query string into percent decoded, multi-valued parameters.
#[must_use]
pub fn parse_query_params(query: Option<&str>) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    if let Some(query) = query {
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            out.entry(k.into_owned()).or_default().push(v.into_owned());
        }
    }
    out
}
