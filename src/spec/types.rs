use crate::method::HttpMethod;
use crate::router::PathMatcher;
use crate::validator::{classify_schema_error, ValidationIssue};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }

    /// Serialization style used when a parameter declares none.
    #[must_use]
    pub const fn default_style(self) -> ParameterStyle {
        match self {
            ParameterLocation::Path | ParameterLocation::Header => ParameterStyle::Simple,
            ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
        }
    }
}

impl Display for ParameterLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenAPI parameter serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "matrix" => Some(ParameterStyle::Matrix),
            "label" => Some(ParameterStyle::Label),
            "form" => Some(ParameterStyle::Form),
            "simple" => Some(ParameterStyle::Simple),
            "spaceDelimited" => Some(ParameterStyle::SpaceDelimited),
            "pipeDelimited" => Some(ParameterStyle::PipeDelimited),
            "deepObject" => Some(ParameterStyle::DeepObject),
            _ => None,
        }
    }
}

impl Display for ParameterStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterStyle::Matrix => "matrix",
            ParameterStyle::Label => "label",
            ParameterStyle::Form => "form",
            ParameterStyle::Simple => "simple",
            ParameterStyle::SpaceDelimited => "spaceDelimited",
            ParameterStyle::PipeDelimited => "pipeDelimited",
            ParameterStyle::DeepObject => "deepObject",
        };
        f.write_str(s)
    }
}

/// A compiled JSON Schema together with its source.
#[derive(Clone)]
pub struct SchemaValidator {
    schema: Value,
    validator: Arc<jsonschema::Validator>,
}

impl SchemaValidator {
    pub(crate) fn new(schema: Value, validator: jsonschema::Validator) -> Self {
        Self {
            schema,
            validator: Arc::new(validator),
        }
    }

    /// The schema with all references inlined.
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Every violation of `instance` as a located issue.
    #[must_use]
    pub fn errors(&self, location: &str, instance: &Value) -> Vec<ValidationIssue> {
        self.validator
            .iter_errors(instance)
            .map(|e| ValidationIssue::new(location, classify_schema_error(e.kind()), e.to_string()))
            .collect()
    }

    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// A resolved operation parameter.
#[derive(Debug, Clone)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub style: ParameterStyle,
    pub explode: bool,
    /// Declared via `content` instead of `schema`; the raw value is a JSON document
    pub json_content: bool,
    pub validator: Option<SchemaValidator>,
}

impl ParameterMeta {
    #[must_use]
    pub fn schema(&self) -> Option<&Value> {
        self.validator.as_ref().map(SchemaValidator::schema)
    }

    /// The schema `default`, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.schema().and_then(|s| s.get("default"))
    }
}

/// One media type entry of a request body or response.
#[derive(Debug, Clone)]
pub struct MediaTypeMeta {
    pub media_type: String,
    pub validator: Option<SchemaValidator>,
}

impl MediaTypeMeta {
    #[must_use]
    pub fn schema(&self) -> Option<&Value> {
        self.validator.as_ref().map(SchemaValidator::schema)
    }
}

/// Select the declared media type matching `mimetype`.
///
/// Exact matches win over `type/*`, which win over `*/*`. Parameters such as `charset`
/// are ignored.
pub fn find_media_type<'a>(content: &'a [MediaTypeMeta], mimetype: &str) -> Option<&'a MediaTypeMeta> {
    let essence = mime_essence(mimetype);
    let main_type = essence.split('/').next().unwrap_or_default();
    content
        .iter()
        .find(|m| mime_essence(&m.media_type) == essence)
        .or_else(|| {
            content.iter().find(|m| {
                let declared = mime_essence(&m.media_type);
                declared.strip_suffix("/*") == Some(main_type)
            })
        })
        .or_else(|| content.iter().find(|m| m.media_type.trim() == "*/*"))
}

/// `type/subtype` lowercased, without parameters.
pub(crate) fn mime_essence(mimetype: &str) -> String {
    mimetype
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[derive(Debug, Clone)]
pub struct RequestBodyMeta {
    pub required: bool,
    pub content: Vec<MediaTypeMeta>,
}

#[derive(Debug, Clone)]
pub struct ResponseMeta {
    /// Status key as written in the document: `"200"`, `"2XX"` or `"default"`
    pub status_key: String,
    pub content: Vec<MediaTypeMeta>,
}

/// Everything needed to validate traffic for one (path, method) operation.
#[derive(Debug, Clone)]
pub struct OperationMeta {
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: Option<String>,
    pub parameters: Vec<ParameterMeta>,
    pub request_body: Option<RequestBodyMeta>,
    pub responses: Vec<ResponseMeta>,
    pub matcher: PathMatcher,
}

impl OperationMeta {
    #[must_use]
    pub fn route_info(&self) -> RouteInfo {
        RouteInfo {
            path: self.path.clone(),
            method: self.method,
        }
    }

    /// Pick the response declared for `status`: exact key, then `NXX` range, then
    /// `default`.
    #[must_use]
    pub fn response_for(&self, status: u16) -> Option<&ResponseMeta> {
        let exact = status.to_string();
        let range = format!("{}XX", status / 100);
        self.responses
            .iter()
            .find(|r| r.status_key == exact)
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|r| r.status_key.eq_ignore_ascii_case(&range))
            })
            .or_else(|| self.responses.iter().find(|r| r.status_key == "default"))
    }
}

/// Path and method an operation is declared under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteInfo {
    pub path: String,
    pub method: HttpMethod,
}

impl Display for RouteInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method.as_str().to_ascii_uppercase(), self.path)
    }
}
