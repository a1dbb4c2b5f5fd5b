use super::adapter::OpenApiRequest;
use crate::cast::{apply_defaults, decode_body, decode_param_value};
use crate::error::Result;
use crate::method::HttpMethod;
use crate::spec::{
    find_media_type, OpenApiSpec, OperationMeta, ParameterLocation, RequestBodyMeta, RouteInfo,
};
use crate::validator::{log_issues, IssueKind, ValidationErrors, ValidationIssue};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Headers OpenAPI forbids describing as parameters; declarations are ignored.
const IGNORED_HEADER_PARAMS: [&str; 3] = ["accept", "content-type", "authorization"];

/// Casted and defaulted parameter values by location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParameters {
    pub query: Map<String, Value>,
    pub path: Map<String, Value>,
    pub header: Map<String, Value>,
    pub cookie: Map<String, Value>,
}

impl ValidatedParameters {
    fn bucket_mut(&mut self, location: ParameterLocation) -> &mut Map<String, Value> {
        match location {
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::Path => &mut self.path,
            ParameterLocation::Header => &mut self.header,
            ParameterLocation::Cookie => &mut self.cookie,
        }
    }
}

/// Outcome of validating one request in collect mode.
#[derive(Debug, Clone, Default)]
pub struct RequestValidationResult {
    pub parameters: ValidatedParameters,
    /// Decoded and defaulted body, `None` when the operation takes none or it was absent
    pub body: Option<Value>,
    /// Every issue found; empty when the request is valid
    pub errors: Vec<ValidationIssue>,
    /// Operation the request resolved to
    pub route: Option<RouteInfo>,
}

impl RequestValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Switch to fail-fast mode: hand back the result only if it carries no issues.
    ///
    /// # Errors
    ///
    /// One [`ValidationErrors`] holding every issue found.
    pub fn raise_for_errors(self) -> std::result::Result<Self, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(ValidationErrors::new("request", self.errors))
        }
    }
}

/// A request that passed validation, with casted values ready for a handler.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub query_params: Map<String, Value>,
    pub path_params: Map<String, Value>,
    pub headers: Map<String, Value>,
    pub cookies: Map<String, Value>,
    /// Decoded body, `Value::Null` when there is none
    pub body: Value,
    /// The adapted request, needed to validate the paired response
    pub request: OpenApiRequest,
}

impl ValidatedRequest {
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&Value> {
        self.path_params.get(name)
    }

    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&Value> {
        self.query_params.get(name)
    }

    /// Declared header parameter; `name` is matched case-insensitively.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&Value> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&Value> {
        self.cookies.get(name)
    }

    /// Operation the request was validated against.
    #[must_use]
    pub fn route(&self) -> Option<&RouteInfo> {
        self.request.route.as_ref()
    }
}

/// Validates adapted requests against a loaded spec.
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator<'a> {
    spec: &'a OpenApiSpec,
}

impl<'a> RequestValidator<'a> {
    #[must_use]
    pub fn new(spec: &'a OpenApiSpec) -> Self {
        Self { spec }
    }

    /// Validate in collect mode. Never fails; inspect
    /// [`RequestValidationResult::errors`].
    #[must_use]
    pub fn validate(&self, request: &OpenApiRequest) -> RequestValidationResult {
        let mut result = RequestValidationResult::default();

        let Some((operation, url_params)) = self.resolve_operation(request, &mut result.errors)
        else {
            log_issues("request", &result.errors);
            return result;
        };
        result.route = Some(operation.route_info());

        // host supplied path values take precedence over the ones matched here
        let mut path_values = url_params;
        path_values.extend(request.parameters.path.clone());

        self.validate_parameters(operation, request, &path_values, &mut result);
        if let Some(body_meta) = &operation.request_body {
            result.body = validate_body(body_meta, request, &mut result.errors);
        }

        debug!(
            request_id = %request.request_id,
            route = %operation.route_info(),
            issues = result.errors.len(),
            "Request validated"
        );
        log_issues("request", &result.errors);
        result
    }

    fn resolve_operation(
        &self,
        request: &OpenApiRequest,
        errors: &mut Vec<ValidationIssue>,
    ) -> Option<(&'a OperationMeta, HashMap<String, String>)> {
        let compiled = self.spec.compiled();
        let url_path = request.url_path();

        if let Some(route) = &request.route {
            return match compiled.operation(&route.path, route.method) {
                Some(op) => {
                    let params = op.matcher.matches(&url_path).unwrap_or_default();
                    Some((op, params))
                }
                None => {
                    errors.push(ValidationIssue::new(
                        "operation",
                        IssueKind::OperationNotFound,
                        format!("No operation declared for {route}"),
                    ));
                    None
                }
            };
        }

        let Ok(method) = request.method.parse::<HttpMethod>() else {
            errors.push(ValidationIssue::new(
                "method",
                IssueKind::OperationNotFound,
                format!("Method '{}' is not an OpenAPI operation", request.method),
            ));
            return None;
        };

        match compiled.find_operation(method, &url_path) {
            Some(found) => Some(found),
            None if compiled.path_exists(&url_path) => {
                errors.push(ValidationIssue::new(
                    "operation",
                    IssueKind::OperationNotFound,
                    format!("Path '{url_path}' declares no '{method}' operation"),
                ));
                None
            }
            None => {
                errors.push(ValidationIssue::new(
                    "path",
                    IssueKind::PathNotFound,
                    format!("Path '{url_path}' not found"),
                ));
                None
            }
        }
    }

    fn validate_parameters(
        &self,
        operation: &OperationMeta,
        request: &OpenApiRequest,
        path_values: &HashMap<String, String>,
        result: &mut RequestValidationResult,
    ) {
        for meta in &operation.parameters {
            if meta.location == ParameterLocation::Header
                && IGNORED_HEADER_PARAMS.contains(&meta.name.to_ascii_lowercase().as_str())
            {
                continue;
            }
            let location = format!("{}.{}", meta.location, meta.name);

            let raw: Option<Vec<String>> = match meta.location {
                ParameterLocation::Query => request.parameters.query.get(&meta.name).cloned(),
                ParameterLocation::Header => request
                    .parameters
                    .header
                    .get(&meta.name.to_ascii_lowercase())
                    .map(|v| vec![v.clone()]),
                ParameterLocation::Path => path_values.get(&meta.name).map(|v| vec![v.clone()]),
                ParameterLocation::Cookie => {
                    request.parameters.cookie.get(&meta.name).map(|v| vec![v.clone()])
                }
            };

            // header names are stored lowercase so lookups are case-insensitive
            let key = if meta.location == ParameterLocation::Header {
                meta.name.to_ascii_lowercase()
            } else {
                meta.name.clone()
            };

            let Some(raw) = raw else {
                if let Some(default) = meta.default_value() {
                    result
                        .parameters
                        .bucket_mut(meta.location)
                        .insert(key, default.clone());
                } else if meta.required {
                    result.errors.push(ValidationIssue::new(
                        location,
                        IssueKind::MissingRequired,
                        format!("Missing required {} parameter '{}'", meta.location, meta.name),
                    ));
                }
                continue;
            };

            let value = match decode_param_value(&raw, meta) {
                Ok(value) => value,
                Err(message) => {
                    result
                        .errors
                        .push(ValidationIssue::new(location, IssueKind::TypeMismatch, message));
                    continue;
                }
            };

            if let Some(validator) = &meta.validator {
                result.errors.extend(validator.errors(&location, &value));
            }
            result.parameters.bucket_mut(meta.location).insert(key, value);
        }
    }
}

fn validate_body(
    body_meta: &RequestBodyMeta,
    request: &OpenApiRequest,
    errors: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    if request.body.is_empty() {
        if body_meta.required {
            errors.push(ValidationIssue::new(
                "body",
                IssueKind::MissingRequired,
                "Request body is required",
            ));
        }
        return None;
    }

    let media = match request.mimetype.as_deref() {
        Some(mimetype) => find_media_type(&body_meta.content, mimetype),
        // without a content type, a single declared media type is assumed
        None if body_meta.content.len() == 1 => body_meta.content.first(),
        None => None,
    };
    let Some(media) = media else {
        let declared: Vec<&str> = body_meta.content.iter().map(|m| m.media_type.as_str()).collect();
        errors.push(ValidationIssue::new(
            "body",
            IssueKind::MediaTypeNotFound,
            format!(
                "Content type '{}' is not declared; expected one of: {}",
                request.mimetype.as_deref().unwrap_or("<none>"),
                declared.join(", ")
            ),
        ));
        return None;
    };

    let mut value = match decode_body(&request.body, &media.media_type, media.schema()) {
        Ok(value) => value,
        Err(message) => {
            errors.push(ValidationIssue::new("body", IssueKind::MalformedBody, message));
            return None;
        }
    };

    if let Some(validator) = &media.validator {
        apply_defaults(&mut value, validator.schema());
        errors.extend(validator.errors("body", &value));
    }
    Some(value)
}

/// Validate an adapted request in fail-fast mode and build the handler input.
///
/// # Errors
///
/// [`Error::Validation`](crate::error::Error::Validation) with every issue found.
pub fn validate_openapi_request(
    mut request: OpenApiRequest,
    spec: &OpenApiSpec,
) -> Result<ValidatedRequest> {
    let result = RequestValidator::new(spec).validate(&request).raise_for_errors()?;
    request.route = result.route;
    Ok(ValidatedRequest {
        query_params: result.parameters.query,
        path_params: result.parameters.path,
        headers: result.parameters.header,
        cookies: result.parameters.cookie,
        body: result.body.unwrap_or(Value::Null),
        request,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestParameters;
    use crate::spec::SpecFormat;
    use bytes::Bytes;
    use serde_json::json;

    const DOC: &str = r#"{
      "openapi": "3.0.3",
      "info": {"title": "Items", "version": "1"},
      "paths": {
        "/items/{id}": {
          "parameters": [
            {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
          ],
          "get": {
            "operationId": "getItem",
            "parameters": [
              {"name": "limit", "in": "query", "schema": {"type": "integer", "default": 10, "maximum": 50}},
              {"name": "X-Trace", "in": "header", "required": true, "schema": {"type": "string"}},
              {"name": "Accept", "in": "header", "required": true, "schema": {"type": "string"}},
              {"name": "session", "in": "cookie", "schema": {"type": "string"}}
            ],
            "responses": {"200": {"description": "ok"}}
          },
          "put": {
            "requestBody": {
              "required": true,
              "content": {"application/json": {"schema": {
                "type": "object",
                "required": ["name"],
                "properties": {"name": {"type": "string"}}
              }}}
            },
            "responses": {"204": {"description": "done"}}
          }
        }
      }
    }"#;

    fn spec() -> OpenApiSpec {
        OpenApiSpec::from_str(DOC, SpecFormat::Json).unwrap()
    }

    fn request(method: &str, url: &str) -> OpenApiRequest {
        let query = url
            .split_once('?')
            .map(|(_, q)| crate::request::parse_query_params(Some(q)))
            .unwrap_or_default();
        OpenApiRequest {
            request_id: crate::ids::RequestId::new(),
            full_url: format!("http://localhost{url}"),
            method: method.to_string(),
            parameters: RequestParameters {
                query,
                ..RequestParameters::default()
            },
            body: Bytes::new(),
            mimetype: None,
            route: None,
        }
    }

    #[test]
    fn test_parameters_are_cast_and_defaulted() {
        let spec = spec();
        let mut req = request("get", "/items/7");
        req.parameters
            .header
            .insert("x-trace".to_string(), "abc".to_string());
        req.parameters
            .cookie
            .insert("session".to_string(), "s1".to_string());
        let result = RequestValidator::new(&spec).validate(&req);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert_eq!(result.parameters.path["id"], json!(7));
        assert_eq!(result.parameters.query["limit"], json!(10));
        assert_eq!(result.parameters.header["x-trace"], json!("abc"));
        assert_eq!(result.parameters.cookie["session"], json!("s1"));
        assert!(result.parameters.header.get("accept").is_none());
        assert_eq!(result.route.unwrap().path, "/items/{id}");
    }

    #[test]
    fn test_collect_mode_returns_every_issue() {
        let spec = spec();
        let req = request("get", "/items/seven?limit=99");
        let result = RequestValidator::new(&spec).validate(&req);
        let kinds: Vec<IssueKind> = result.errors.iter().map(|e| e.kind).collect();
        assert_eq!(result.errors.len(), 3, "{:?}", result.errors);
        assert!(kinds.contains(&IssueKind::TypeMismatch));
        assert!(kinds.contains(&IssueKind::MissingRequired));
        assert!(kinds.contains(&IssueKind::Schema));
        let err = result.raise_for_errors().unwrap_err();
        assert_eq!(err.issues.len(), 3);
    }

    #[test]
    fn test_unknown_path_and_method() {
        let spec = spec();
        let result = RequestValidator::new(&spec).validate(&request("get", "/nothing"));
        assert_eq!(result.errors[0].kind, IssueKind::PathNotFound);
        let result = RequestValidator::new(&spec).validate(&request("delete", "/items/1"));
        assert_eq!(result.errors[0].kind, IssueKind::OperationNotFound);
        let result = RequestValidator::new(&spec).validate(&request("connect", "/items/1"));
        assert_eq!(result.errors[0].kind, IssueKind::OperationNotFound);
    }

    #[test]
    fn test_body_rules() {
        let spec = spec();
        let validator = RequestValidator::new(&spec);

        let missing = validator.validate(&request("put", "/items/1"));
        assert_eq!(missing.errors[0].kind, IssueKind::MissingRequired);

        let mut wrong_type = request("put", "/items/1");
        wrong_type.body = Bytes::from_static(b"name=x");
        wrong_type.mimetype = Some("application/x-www-form-urlencoded".to_string());
        let result = validator.validate(&wrong_type);
        assert_eq!(result.errors[0].kind, IssueKind::MediaTypeNotFound);

        let mut malformed = request("put", "/items/1");
        malformed.body = Bytes::from_static(b"{name");
        malformed.mimetype = Some("application/json".to_string());
        assert_eq!(validator.validate(&malformed).errors[0].kind, IssueKind::MalformedBody);

        let mut untyped = request("put", "/items/1");
        untyped.body = Bytes::from_static(br#"{"name": "x"}"#);
        let result = validator.validate(&untyped);
        assert!(result.is_valid());
        assert_eq!(result.body, Some(json!({"name": "x"})));
    }

    #[test]
    fn test_known_route_skips_matching() {
        let spec = spec();
        let mut req = request("get", "/elsewhere").with_route(RouteInfo {
            path: "/items/{id}".to_string(),
            method: HttpMethod::Get,
        });
        req.parameters.path.insert("id".to_string(), "3".to_string());
        req.parameters
            .header
            .insert("x-trace".to_string(), "t".to_string());
        let validated = validate_openapi_request(req, &spec).unwrap();
        assert_eq!(validated.get_path_param("id"), Some(&json!(3)));
        assert_eq!(validated.get_header("X-Trace"), Some(&json!("t")));
        assert_eq!(validated.body, Value::Null);
        assert_eq!(validated.route().unwrap().method, HttpMethod::Get);
    }
}
