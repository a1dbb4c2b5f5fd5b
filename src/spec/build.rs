use super::types::{
    MediaTypeMeta, OperationMeta, ParameterLocation, ParameterMeta, ParameterStyle,
    RequestBodyMeta, ResponseMeta, SchemaValidator,
};
use crate::error::SpecLoadError;
use crate::method::HttpMethod;
use crate::router::PathMatcher;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Maximum number of nested `$ref` hops inlined into one schema. Recursive schemas are
/// cut off here and accept anything below the cut.
const MAX_SCHEMA_REF_DEPTH: usize = 10;

/// Maximum length of a `$ref` chain for parameters, bodies, responses and path items.
const MAX_OBJECT_REF_CHAIN: usize = 32;

/// Keys whose values are data, not schemas, and must not be rewritten.
const DATA_KEYS: [&str; 5] = ["example", "examples", "default", "enum", "const"];

/// Keys whose values map arbitrary names to schemas.
const SCHEMA_MAP_KEYS: [&str; 5] = [
    "properties",
    "patternProperties",
    "definitions",
    "$defs",
    "dependentSchemas",
];

/// Options controlling schema compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Enforce `format` keywords (`date-time`, `email`, ...)
    pub validate_formats: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            validate_formats: true,
        }
    }
}

/// Per-operation validation context built once from a document.
#[derive(Debug, Clone)]
pub struct CompiledSpec {
    base_path: String,
    operations: Vec<OperationMeta>,
    index: HashMap<(String, HttpMethod), usize>,
}

impl CompiledSpec {
    /// Compile every operation of `document`.
    ///
    /// # Errors
    ///
    /// Fails on unresolvable `$ref`s, schemas `jsonschema` rejects, and parameters
    /// without a name or location.
    pub fn compile(document: &Value, options: &CompileOptions) -> Result<Self, SpecLoadError> {
        let resolver = RefResolver { root: document };
        let base_path = extract_base_path(document);
        let mut operations = Vec::new();
        let mut index = HashMap::new();
        let mut seen_ids: HashMap<String, String> = HashMap::new();

        let paths = document
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| SpecLoadError::InvalidDocument {
                reason: "missing `paths` mapping".to_string(),
            })?;

        for (path, raw_item) in paths {
            let item = resolver.deref_object(raw_item, path)?;
            let Some(item_map) = item.as_object() else {
                warn!(path = %path, "Path item is not an object, skipping");
                continue;
            };
            let shared_params = item_map.get("parameters");

            for (key, raw_operation) in item_map {
                let Ok(method) = key.parse::<HttpMethod>() else {
                    continue;
                };
                let location = format!("{path} -> {method}");
                let operation = resolver.deref_object(raw_operation, &location)?;

                let operation_id = operation
                    .get("operationId")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if let Some(id) = &operation_id {
                    if let Some(previous) = seen_ids.insert(id.clone(), location.clone()) {
                        warn!(
                            operation_id = %id,
                            first = %previous,
                            duplicate = %location,
                            "Duplicate operationId; lookups return the first declaration"
                        );
                    }
                }

                let mut parameters =
                    compile_parameters(&resolver, shared_params, &location, options)?;
                let own = compile_parameters(
                    &resolver,
                    operation.get("parameters"),
                    &location,
                    options,
                )?;
                for param in own {
                    parameters.retain(|p| !(p.name == param.name && p.location == param.location));
                    parameters.push(param);
                }

                let request_body = match operation.get("requestBody") {
                    Some(raw) => Some(compile_request_body(&resolver, raw, &location, options)?),
                    None => None,
                };
                let responses = compile_responses(&resolver, operation.get("responses"), &location, options)?;

                let matcher = PathMatcher::new(&base_path, path).map_err(|e| {
                    SpecLoadError::InvalidDocument {
                        reason: format!("path template '{path}' cannot be matched: {e}"),
                    }
                })?;

                debug!(
                    path = %path,
                    method = %method,
                    operation_id = ?operation_id,
                    parameters = parameters.len(),
                    responses = responses.len(),
                    "Operation compiled"
                );

                index.insert((path.clone(), method), operations.len());
                operations.push(OperationMeta {
                    path: path.clone(),
                    method,
                    operation_id,
                    parameters,
                    request_body,
                    responses,
                    matcher,
                });
            }
        }

        info!(
            operations_count = operations.len(),
            base_path = %base_path,
            validate_formats = options.validate_formats,
            "OpenAPI spec compiled"
        );

        Ok(Self {
            base_path,
            operations,
            index,
        })
    }

    /// Path component of the first `servers` entry, `""` when absent or `/`.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// All operations in document order.
    #[must_use]
    pub fn operations(&self) -> &[OperationMeta] {
        &self.operations
    }

    /// The operation declared literally under `path` and `method`.
    #[must_use]
    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&OperationMeta> {
        self.index
            .get(&(path.to_string(), method))
            .and_then(|i| self.operations.get(*i))
    }

    /// Match a concrete URL path against the declared templates.
    ///
    /// Templates without parameters are tried first so `/users/me` wins over
    /// `/users/{id}`. Returns the operation and the extracted path parameters.
    #[must_use]
    pub fn find_operation(
        &self,
        method: HttpMethod,
        url_path: &str,
    ) -> Option<(&OperationMeta, HashMap<String, String>)> {
        let candidates = self.operations.iter().filter(|op| op.method == method);
        let (literal, templated): (Vec<_>, Vec<_>) =
            candidates.partition(|op| op.matcher.is_literal());
        literal
            .into_iter()
            .chain(templated)
            .find_map(|op| op.matcher.matches(url_path).map(|params| (op, params)))
    }

    /// True if `url_path` matches some template under any method.
    #[must_use]
    pub fn path_exists(&self, url_path: &str) -> bool {
        self.operations
            .iter()
            .any(|op| op.matcher.matches(url_path).is_some())
    }
}

/// Resolves local `$ref`s against the document root.
struct RefResolver<'a> {
    root: &'a Value,
}

impl<'a> RefResolver<'a> {
    fn lookup(&self, reference: &str, location: &str) -> Result<&'a Value, SpecLoadError> {
        let unresolved = || SpecLoadError::UnresolvedRef {
            reference: reference.to_string(),
            location: location.to_string(),
        };
        let pointer = reference.strip_prefix('#').ok_or_else(unresolved)?;
        let pointer = urlencoding::decode(pointer).map_err(|_| unresolved())?;
        self.root.pointer(&pointer).ok_or_else(unresolved)
    }

    /// Follow a chain of `$ref`s to the referenced object.
    fn deref_object(&self, value: &'a Value, location: &str) -> Result<&'a Value, SpecLoadError> {
        let mut current = value;
        for _ in 0..MAX_OBJECT_REF_CHAIN {
            match current.get("$ref").and_then(Value::as_str) {
                Some(reference) => current = self.lookup(reference, location)?,
                None => return Ok(current),
            }
        }
        Err(SpecLoadError::UnresolvedRef {
            reference: value
                .get("$ref")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            location: format!("{location} (reference cycle)"),
        })
    }

    /// Copy `schema` with every `$ref` inlined.
    fn inline_schema(&self, schema: &Value, location: &str) -> Result<Value, SpecLoadError> {
        let mut out = schema.clone();
        self.expand(&mut out, 0, location)?;
        Ok(out)
    }

    fn expand(&self, value: &mut Value, depth: usize, location: &str) -> Result<(), SpecLoadError> {
        if let Some(reference) = value.get("$ref").and_then(Value::as_str).map(str::to_string) {
            if depth >= MAX_SCHEMA_REF_DEPTH {
                debug!(reference = %reference, location = %location, "Recursive schema cut off");
                *value = Value::Object(Map::new());
                return Ok(());
            }
            let mut target = self.lookup(&reference, location)?.clone();
            self.expand(&mut target, depth + 1, location)?;
            *value = target;
            return Ok(());
        }

        match value {
            Value::Object(obj) => {
                normalize_openapi_keywords(obj);
                for (key, child) in obj.iter_mut() {
                    if DATA_KEYS.contains(&key.as_str()) || key.starts_with("x-") {
                        continue;
                    }
                    if SCHEMA_MAP_KEYS.contains(&key.as_str()) {
                        if let Value::Object(schemas) = child {
                            for schema in schemas.values_mut() {
                                self.expand(schema, depth, location)?;
                            }
                        }
                        continue;
                    }
                    self.expand(child, depth, location)?;
                }
            }
            Value::Array(items) => {
                for child in items {
                    self.expand(child, depth, location)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Rewrite OpenAPI 3.0 schema dialect into plain JSON Schema.
///
/// `nullable: true` widens `type` (and `enum`) with `null`; boolean
/// `exclusiveMinimum`/`exclusiveMaximum` are folded into their numeric form.
fn normalize_openapi_keywords(obj: &mut Map<String, Value>) {
    if obj.get("nullable").and_then(Value::as_bool) == Some(true) {
        if let Some(Value::String(ty)) = obj.get("type") {
            let widened = Value::Array(vec![Value::String(ty.clone()), Value::from("null")]);
            obj.insert("type".to_string(), widened);
        }
        if let Some(Value::Array(members)) = obj.get_mut("enum") {
            if !members.contains(&Value::Null) {
                members.push(Value::Null);
            }
        }
    }

    for (exclusive, bound) in [("exclusiveMinimum", "minimum"), ("exclusiveMaximum", "maximum")] {
        if let Some(flag) = obj.get(exclusive).and_then(Value::as_bool) {
            obj.remove(exclusive);
            if flag {
                if let Some(limit) = obj.remove(bound) {
                    obj.insert(exclusive.to_string(), limit);
                }
            }
        }
    }
}

fn compile_schema(
    schema: Value,
    location: &str,
    options: &CompileOptions,
) -> Result<SchemaValidator, SpecLoadError> {
    let validator = jsonschema::options()
        .should_validate_formats(options.validate_formats)
        .build(&schema)
        .map_err(|e| SpecLoadError::InvalidSchema {
            location: location.to_string(),
            message: e.to_string(),
        })?;
    Ok(SchemaValidator::new(schema, validator))
}

fn compile_parameters(
    resolver: &RefResolver<'_>,
    raw: Option<&Value>,
    location: &str,
    options: &CompileOptions,
) -> Result<Vec<ParameterMeta>, SpecLoadError> {
    let Some(list) = raw.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(list.len());
    for raw_param in list {
        let param = resolver.deref_object(raw_param, location)?;
        let name = param
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SpecLoadError::InvalidDocument {
                reason: format!("parameter without `name` at {location}"),
            })?;
        let param_location = param
            .get("in")
            .and_then(Value::as_str)
            .and_then(ParameterLocation::parse)
            .ok_or_else(|| SpecLoadError::InvalidDocument {
                reason: format!("parameter '{name}' has no valid `in` at {location}"),
            })?;
        let param_path = format!("{location} -> {param_location}.{name}");

        // path parameters are always required
        let required = param_location == ParameterLocation::Path
            || param.get("required").and_then(Value::as_bool).unwrap_or(false);
        let style = param
            .get("style")
            .and_then(Value::as_str)
            .and_then(ParameterStyle::parse)
            .unwrap_or_else(|| param_location.default_style());
        let explode = param
            .get("explode")
            .and_then(Value::as_bool)
            .unwrap_or(style == ParameterStyle::Form);

        let (schema, json_content) = match param.get("schema") {
            Some(schema) => (Some(schema), false),
            None => {
                let from_content = param
                    .get("content")
                    .and_then(Value::as_object)
                    .and_then(|content| content.values().next())
                    .and_then(|media| media.get("schema"));
                (from_content, from_content.is_some())
            }
        };
        let validator = match schema {
            Some(schema) => {
                let inlined = resolver.inline_schema(schema, &param_path)?;
                Some(compile_schema(inlined, &param_path, options)?)
            }
            None => None,
        };

        out.push(ParameterMeta {
            name: name.to_string(),
            location: param_location,
            required,
            style,
            explode,
            json_content,
            validator,
        });
    }
    Ok(out)
}

fn compile_content(
    resolver: &RefResolver<'_>,
    content: Option<&Value>,
    location: &str,
    options: &CompileOptions,
) -> Result<Vec<MediaTypeMeta>, SpecLoadError> {
    let Some(content) = content.and_then(Value::as_object) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(content.len());
    for (media_type, media) in content {
        let media_location = format!("{location} -> {media_type}");
        let validator = match media.get("schema") {
            Some(schema) => {
                let inlined = resolver.inline_schema(schema, &media_location)?;
                Some(compile_schema(inlined, &media_location, options)?)
            }
            None => None,
        };
        out.push(MediaTypeMeta {
            media_type: media_type.clone(),
            validator,
        });
    }
    Ok(out)
}

fn compile_request_body(
    resolver: &RefResolver<'_>,
    raw: &Value,
    location: &str,
    options: &CompileOptions,
) -> Result<RequestBodyMeta, SpecLoadError> {
    let body = resolver.deref_object(raw, location)?;
    let body_location = format!("{location} -> requestBody");
    Ok(RequestBodyMeta {
        required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
        content: compile_content(resolver, body.get("content"), &body_location, options)?,
    })
}

fn compile_responses(
    resolver: &RefResolver<'_>,
    raw: Option<&Value>,
    location: &str,
    options: &CompileOptions,
) -> Result<Vec<ResponseMeta>, SpecLoadError> {
    let Some(responses) = raw.and_then(Value::as_object) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(responses.len());
    for (status_key, raw_response) in responses {
        if status_key.starts_with("x-") {
            continue;
        }
        let response_location = format!("{location} -> {status_key}");
        let response = resolver.deref_object(raw_response, &response_location)?;
        out.push(ResponseMeta {
            status_key: status_key.clone(),
            content: compile_content(resolver, response.get("content"), &response_location, options)?,
        });
    }
    Ok(out)
}

/// Path of the first `servers` entry with variables replaced by their defaults.
pub(crate) fn extract_base_path(document: &Value) -> String {
    let Some(server) = document
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
    else {
        return String::new();
    };
    let Some(raw_url) = server.get("url").and_then(Value::as_str) else {
        return String::new();
    };

    let mut url_str = raw_url.to_string();
    if let Some(variables) = server.get("variables").and_then(Value::as_object) {
        for (name, variable) in variables {
            if let Some(default) = variable.get("default").and_then(Value::as_str) {
                url_str = url_str.replace(&format!("{{{name}}}"), default);
            }
        }
    }

    url::Url::parse(&url_str)
        .or_else(|_| url::Url::parse(&format!("http://dummy{url_str}")))
        .map(|u| {
            let p = u.path().trim_end_matches('/');
            if p == "/" || p.is_empty() {
                String::new()
            } else {
                p.to_string()
            }
        })
        .unwrap_or_default()
}
