//! # OpenAPI Document Loading
//!
//! [`OpenApiSpec`] owns the parsed document (as a `serde_json::Value`, in document order)
//! and the [`CompiledSpec`] built from it: resolved parameters, request bodies and
//! responses with compiled JSON Schema validators, and one path matcher per operation.
//!
//! Both are immutable after construction. Share a loaded spec with `Arc` between routes,
//! validators and the application.
//!
//! ```rust,ignore
//! use apiprimed::spec::OpenApiSpec;
//!
//! let spec = OpenApiSpec::from_path("openapi.yaml")?;
//! let info = spec.lookup_by_operation_id("greetPost").expect("declared");
//! assert_eq!(info.path, "/greet/{lang}");
//! ```

mod build;
mod load;
mod types;

pub use build::{CompileOptions, CompiledSpec};
pub use load::SpecFormat;
pub use types::*;

use crate::error::SpecLoadError;
use crate::method::HttpMethod;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// A loaded OpenAPI 3.x document plus its compiled validation context.
#[derive(Debug, Clone)]
pub struct OpenApiSpec {
    path: Option<PathBuf>,
    content: Value,
    compiled: CompiledSpec,
    content_hash: String,
}

impl OpenApiSpec {
    /// Load a YAML or JSON document from disk.
    ///
    /// # Errors
    ///
    /// [`SpecLoadError`] when the file cannot be read or parsed, or the document does not
    /// compile.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SpecLoadError> {
        Self::from_path_with_options(path, &CompileOptions::default())
    }

    /// Like [`OpenApiSpec::from_path`] with explicit compile options.
    ///
    /// # Errors
    ///
    /// See [`OpenApiSpec::from_path`].
    pub fn from_path_with_options(
        path: impl AsRef<Path>,
        options: &CompileOptions,
    ) -> Result<Self, SpecLoadError> {
        let path = path.as_ref();
        let content = load::read_file(path)?;
        let mut spec = Self::build(&content, SpecFormat::from_path(path), options)?;
        spec.path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            title = %spec.title().unwrap_or_default(),
            operations_count = spec.compiled.operations().len(),
            content_hash = %spec.content_hash,
            "OpenAPI spec loaded"
        );
        Ok(spec)
    }

    /// Load a document from memory.
    ///
    /// # Errors
    ///
    /// [`SpecLoadError`] when the text does not parse or the document does not compile.
    pub fn from_str(content: &str, format: SpecFormat) -> Result<Self, SpecLoadError> {
        Self::from_str_with_options(content, format, &CompileOptions::default())
    }

    /// Like [`OpenApiSpec::from_str`] with explicit compile options.
    ///
    /// # Errors
    ///
    /// See [`OpenApiSpec::from_str`].
    pub fn from_str_with_options(
        content: &str,
        format: SpecFormat,
        options: &CompileOptions,
    ) -> Result<Self, SpecLoadError> {
        Self::build(content, format, options)
    }

    fn build(content: &str, format: SpecFormat, options: &CompileOptions) -> Result<Self, SpecLoadError> {
        let mut document = load::parse_document(content, format)?;
        load::strip_unknown_verbs(&mut document);
        let compiled = CompiledSpec::compile(&document, options)?;
        Ok(Self {
            path: None,
            content: document,
            compiled,
            content_hash: load::content_hash(content),
        })
    }

    /// File the document was read from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The parsed document.
    #[must_use]
    pub fn content(&self) -> &Value {
        &self.content
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledSpec {
        &self.compiled
    }

    /// Short SHA-256 of the raw document text.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// `info.title`, if declared.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.content
            .get("info")
            .and_then(|i| i.get("title"))
            .and_then(Value::as_str)
    }

    /// Path of the first `servers` entry.
    #[must_use]
    pub fn base_path(&self) -> &str {
        self.compiled.base_path()
    }

    /// Find the path and method declaring `operation_id`.
    ///
    /// Scans path items and their operations in document order and returns the first
    /// match. Nothing is cached; every call walks the document again.
    #[must_use]
    pub fn lookup_by_operation_id(&self, operation_id: &str) -> Option<RouteInfo> {
        let paths = self.content.get("paths")?.as_object()?;
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            for (key, operation) in item {
                let Ok(method) = key.parse::<HttpMethod>() else {
                    continue;
                };
                if operation.get("operationId").and_then(Value::as_str) == Some(operation_id) {
                    return Some(RouteInfo {
                        path: path.clone(),
                        method,
                    });
                }
            }
        }
        None
    }

    /// Alias of [`OpenApiSpec::lookup_by_operation_id`].
    #[must_use]
    pub fn get_route_by_id(&self, operation_id: &str) -> Option<RouteInfo> {
        self.lookup_by_operation_id(operation_id)
    }

    /// True when `paths[path][method]` is declared literally.
    #[must_use]
    pub fn has_operation(&self, path: &str, method: HttpMethod) -> bool {
        self.content
            .get("paths")
            .and_then(|p| p.get(path))
            .and_then(|item| item.get(method.as_str()))
            .is_some()
    }

    /// Every operation with its operation id, in document order.
    #[must_use]
    pub fn operations(&self) -> Vec<(RouteInfo, Option<String>)> {
        self.compiled
            .operations()
            .iter()
            .map(|op| (op.route_info(), op.operation_id.clone()))
            .collect()
    }
}

impl std::str::FromStr for OpenApiSpec {
    type Err = SpecLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpenApiSpec::from_str(s, SpecFormat::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: "1"
servers:
  - url: /v1
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        "200":
          description: ok
    post:
      operationId: createPet
      responses:
        "201":
          description: created
  /pets/{id}:
    parameters:
      - name: id
        in: path
        required: true
        schema:
          type: integer
    get:
      operationId: getPet
      responses:
        "200":
          description: ok
"#;

    #[test]
    fn test_lookup_by_operation_id() {
        let spec = OpenApiSpec::from_str(DOC, SpecFormat::Yaml).unwrap();
        let info = spec.lookup_by_operation_id("getPet").unwrap();
        assert_eq!(info.path, "/pets/{id}");
        assert_eq!(info.method, HttpMethod::Get);
        assert_eq!(spec.get_route_by_id("createPet").unwrap().method, HttpMethod::Post);
        assert!(spec.lookup_by_operation_id("deletePet").is_none());
    }

    #[test]
    fn test_metadata_accessors() {
        let spec: OpenApiSpec = DOC.parse().unwrap();
        assert_eq!(spec.title(), Some("Pets"));
        assert_eq!(spec.base_path(), "/v1");
        assert!(spec.path().is_none());
        assert!(spec.has_operation("/pets", HttpMethod::Post));
        assert!(!spec.has_operation("/pets", HttpMethod::Delete));
        assert!(!spec.has_operation("/pets/{id}", HttpMethod::Post));
        let ops = spec.operations();
        let ids: Vec<_> = ops.iter().map(|(_, id)| id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["listPets", "createPet", "getPet"]);
    }
}
