use super::adapter::OpenApiResponse;
use crate::cast::{apply_defaults, decode_body, is_json_media_type};
use crate::error::Result;
use crate::method::HttpMethod;
use crate::request::{OpenApiRequest, ValidatedRequest};
use crate::spec::{find_media_type, OpenApiSpec, OperationMeta};
use crate::validator::{log_issues, IssueKind, ValidationErrors, ValidationIssue};
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderValue, Response};
use serde_json::Value;
use tracing::debug;

/// Outcome of validating one response in collect mode.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidationResult {
    /// Decoded and defaulted body, `None` when no content is declared
    pub data: Option<Value>,
    pub errors: Vec<ValidationIssue>,
}

impl ResponseValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// # Errors
    ///
    /// One [`ValidationErrors`] holding every issue found.
    pub fn raise_for_errors(self) -> std::result::Result<Self, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(ValidationErrors::new("response", self.errors))
        }
    }
}

/// Validates responses against the operation their request resolved to.
#[derive(Debug, Clone, Copy)]
pub struct ResponseValidator<'a> {
    spec: &'a OpenApiSpec,
}

impl<'a> ResponseValidator<'a> {
    #[must_use]
    pub fn new(spec: &'a OpenApiSpec) -> Self {
        Self { spec }
    }

    /// Validate in collect mode. Never fails.
    #[must_use]
    pub fn validate(
        &self,
        request: &OpenApiRequest,
        response: &OpenApiResponse,
    ) -> ResponseValidationResult {
        let mut result = ResponseValidationResult::default();

        let Some(operation) = self.resolve_operation(request) else {
            result.errors.push(ValidationIssue::new(
                "operation",
                IssueKind::OperationNotFound,
                format!(
                    "No operation found for {} {}",
                    request.method,
                    request.url_path()
                ),
            ));
            log_issues("response", &result.errors);
            return result;
        };

        let Some(declared) = operation.response_for(response.status) else {
            result.errors.push(ValidationIssue::new(
                "status",
                IssueKind::ResponseNotFound,
                format!(
                    "Status {} is not declared for {}",
                    response.status,
                    operation.route_info()
                ),
            ));
            log_issues("response", &result.errors);
            return result;
        };

        if declared.content.is_empty() {
            return result;
        }

        let media = match response.mimetype.as_deref() {
            Some(mimetype) => find_media_type(&declared.content, mimetype),
            None if declared.content.len() == 1 => declared.content.first(),
            None => None,
        };
        let Some(media) = media else {
            result.errors.push(ValidationIssue::new(
                "body",
                IssueKind::MediaTypeNotFound,
                format!(
                    "Content type '{}' is not declared for status {}",
                    response.mimetype.as_deref().unwrap_or("<none>"),
                    declared.status_key
                ),
            ));
            log_issues("response", &result.errors);
            return result;
        };

        if response.data.is_empty() {
            result.errors.push(ValidationIssue::new(
                "body",
                IssueKind::MissingRequired,
                "Response body is missing",
            ));
            log_issues("response", &result.errors);
            return result;
        }

        let mut value = match decode_body(&response.data, &media.media_type, media.schema()) {
            Ok(value) => value,
            Err(message) => {
                result
                    .errors
                    .push(ValidationIssue::new("body", IssueKind::MalformedBody, message));
                log_issues("response", &result.errors);
                return result;
            }
        };

        if let Some(validator) = &media.validator {
            apply_defaults(&mut value, validator.schema());
            result.errors.extend(validator.errors("body", &value));
        }
        result.data = Some(value);

        debug!(
            request_id = %request.request_id,
            status = response.status,
            status_key = %declared.status_key,
            issues = result.errors.len(),
            "Response validated"
        );
        log_issues("response", &result.errors);
        result
    }

    fn resolve_operation(&self, request: &OpenApiRequest) -> Option<&'a OperationMeta> {
        let compiled = self.spec.compiled();
        if let Some(route) = &request.route {
            return compiled.operation(&route.path, route.method);
        }
        let method = request.method.parse::<HttpMethod>().ok()?;
        compiled
            .find_operation(method, &request.url_path())
            .map(|(op, _)| op)
    }
}

/// Validate a handler response against the operation of its request.
///
/// On success a new response is returned: status, version and headers are copied, a JSON
/// body is replaced by the re-encoded, defaulted value and `content-length` is updated.
/// Other bodies are carried over unchanged. The original response is not modified.
///
/// # Errors
///
/// [`Error::Validation`](crate::error::Error::Validation) with every issue found.
pub fn validate_response(
    response: &Response<Bytes>,
    request: &ValidatedRequest,
    spec: &OpenApiSpec,
) -> Result<Response<Bytes>> {
    validate_openapi_response(response, &request.request, spec)
}

/// Like [`validate_response`], paired with the adapted request instead of the validated
/// one.
///
/// # Errors
///
/// [`Error::Validation`](crate::error::Error::Validation) with every issue found.
pub fn validate_openapi_response(
    response: &Response<Bytes>,
    request: &OpenApiRequest,
    spec: &OpenApiSpec,
) -> Result<Response<Bytes>> {
    let adapted = OpenApiResponse::from_http(response);
    let result = ResponseValidator::new(spec)
        .validate(request, &adapted)
        .raise_for_errors()?;

    let body = match (&result.data, adapted.mimetype.as_deref()) {
        (Some(data), Some(mimetype)) if is_json_media_type(mimetype) => Bytes::from(data.to_string()),
        (Some(data), None) if data.is_object() || data.is_array() => Bytes::from(data.to_string()),
        _ => adapted.data.clone(),
    };

    let mut casted = Response::new(body);
    *casted.status_mut() = response.status();
    *casted.version_mut() = response.version();
    *casted.headers_mut() = response.headers().clone();
    let length = casted.body().len();
    casted
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(length));
    Ok(casted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RequestId;
    use crate::request::RequestParameters;
    use crate::spec::{RouteInfo, SpecFormat};
    use http::StatusCode;
    use serde_json::json;

    const DOC: &str = r#"
openapi: 3.1.0
info: {title: Status, version: "1"}
paths:
  /status:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: object
                required: [state]
                properties:
                  state: {type: string}
                  retries: {type: integer, default: 0}
        "4XX":
          description: client error
          content:
            text/plain:
              schema: {type: string}
        "204":
          description: empty
"#;

    fn request() -> OpenApiRequest {
        OpenApiRequest {
            request_id: RequestId::new(),
            full_url: "http://localhost/status".to_string(),
            method: "get".to_string(),
            parameters: RequestParameters::default(),
            body: Bytes::new(),
            mimetype: None,
            route: Some(RouteInfo {
                path: "/status".to_string(),
                method: HttpMethod::Get,
            }),
        }
    }

    fn response(status: u16, mimetype: Option<&str>, body: &'static [u8]) -> OpenApiResponse {
        OpenApiResponse {
            status,
            mimetype: mimetype.map(str::to_string),
            data: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_status_selection() {
        let spec = OpenApiSpec::from_str(DOC, SpecFormat::Yaml).unwrap();
        let validator = ResponseValidator::new(&spec);
        let req = request();

        let ok = validator.validate(&req, &response(200, Some("application/json"), br#"{"state":"up"}"#));
        assert!(ok.is_valid(), "{:?}", ok.errors);
        assert_eq!(ok.data, Some(json!({"state": "up", "retries": 0})));

        let ranged = validator.validate(&req, &response(404, Some("text/plain"), b"gone"));
        assert!(ranged.is_valid(), "{:?}", ranged.errors);
        assert_eq!(ranged.data, Some(json!("gone")));

        let empty = validator.validate(&req, &response(204, None, b""));
        assert!(empty.is_valid());
        assert!(empty.data.is_none());

        let undeclared = validator.validate(&req, &response(500, None, b""));
        assert_eq!(undeclared.errors[0].kind, IssueKind::ResponseNotFound);
    }

    #[test]
    fn test_response_issues() {
        let spec = OpenApiSpec::from_str(DOC, SpecFormat::Yaml).unwrap();
        let validator = ResponseValidator::new(&spec);
        let req = request();

        let missing = validator.validate(&req, &response(200, Some("application/json"), b"{}"));
        assert_eq!(missing.errors[0].kind, IssueKind::MissingRequired);

        let wrong_media = validator.validate(&req, &response(200, Some("text/html"), b"<p>"));
        assert_eq!(wrong_media.errors[0].kind, IssueKind::MediaTypeNotFound);

        let no_body = validator.validate(&req, &response(200, Some("application/json"), b""));
        assert_eq!(no_body.errors[0].kind, IssueKind::MissingRequired);
    }

    #[test]
    fn test_validate_response_copies() {
        let spec = OpenApiSpec::from_str(DOC, SpecFormat::Yaml).unwrap();
        let validated = ValidatedRequest {
            query_params: Default::default(),
            path_params: Default::default(),
            headers: Default::default(),
            cookies: Default::default(),
            body: Value::Null,
            request: request(),
        };
        let original = crate::response::json_response(StatusCode::OK, &json!({"state": "up"}));
        let casted = validate_response(&original, &validated, &spec).unwrap();
        assert_eq!(casted.body(), &Bytes::from_static(br#"{"state":"up","retries":0}"#));
        assert_eq!(casted.headers()[CONTENT_LENGTH], "26");
        assert_eq!(original.body(), &Bytes::from_static(br#"{"state":"up"}"#));
        assert!(original.headers().get(CONTENT_LENGTH).is_none());
    }
}
