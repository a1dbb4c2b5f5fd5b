use crate::error::SpecLoadError;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};

const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

/// Serialization of an OpenAPI document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Json,
    /// Try JSON first, then YAML
    Auto,
}

impl SpecFormat {
    /// Choose the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => SpecFormat::Yaml,
            Some("json") => SpecFormat::Json,
            _ => SpecFormat::Auto,
        }
    }
}

/// Parse document text into a JSON value.
pub(crate) fn parse_document(content: &str, format: SpecFormat) -> Result<Value, SpecLoadError> {
    let value = match format {
        SpecFormat::Yaml => serde_yaml::from_str(content)?,
        SpecFormat::Json => serde_json::from_str(content)?,
        SpecFormat::Auto => match serde_json::from_str(content) {
            Ok(value) => value,
            Err(json_err) => {
                debug!(error = %json_err, "Document is not JSON, trying YAML");
                serde_yaml::from_str(content)?
            }
        },
    };
    check_document(&value)?;
    Ok(value)
}

fn check_document(value: &Value) -> Result<(), SpecLoadError> {
    let Some(root) = value.as_object() else {
        return Err(SpecLoadError::InvalidDocument {
            reason: "top level is not a mapping".to_string(),
        });
    };
    // an unquoted `openapi: 3.1` arrives as a number
    let version = root.get("openapi").and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    match version {
        Some(version) if version.starts_with("3.") => {}
        Some(version) => {
            return Err(SpecLoadError::InvalidDocument {
                reason: format!("unsupported OpenAPI version '{version}', expected 3.x"),
            })
        }
        None => {
            return Err(SpecLoadError::InvalidDocument {
                reason: "missing `openapi` version field".to_string(),
            })
        }
    }
    if !root.get("paths").is_some_and(Value::is_object) {
        return Err(SpecLoadError::InvalidDocument {
            reason: "missing `paths` mapping".to_string(),
        });
    }
    Ok(())
}

/// Drop keys under path items that are neither HTTP methods nor known path item fields.
pub(crate) fn strip_unknown_verbs(val: &mut Value) {
    let Some(Value::Object(paths_map)) = val.get_mut("paths") else {
        return;
    };
    for (path, item) in paths_map.iter_mut() {
        if let Value::Object(obj) = item {
            let keys: Vec<String> = obj.keys().cloned().collect();
            for k in keys {
                let lk = k.to_ascii_lowercase();
                let keep = match lk.as_str() {
                    "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                    m if METHODS.contains(&m) => true,
                    _ => k.starts_with("x-"),
                };
                if !keep {
                    warn!(path = %path, key = %k, "Ignoring unknown key in path item");
                    obj.remove(&k);
                }
            }
        }
    }
}

/// First 16 hex characters of the SHA-256 of `content`.
pub(crate) fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn read_file(path: &Path) -> Result<String, SpecLoadError> {
    std::fs::read_to_string(path).map_err(|source| SpecLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_unknown_verbs() {
        let mut v = json!({
            "paths": {
                "/x": { "get": {}, "patch": {}, "unknown": {}, "x-internal": true, "summary": "s" }
            }
        });
        strip_unknown_verbs(&mut v);
        assert!(v["paths"]["/x"].get("unknown").is_none());
        assert!(v["paths"]["/x"].get("patch").is_some());
        assert!(v["paths"]["/x"].get("x-internal").is_some());
        assert!(v["paths"]["/x"].get("summary").is_some());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SpecFormat::from_path(Path::new("a/openapi.YML")), SpecFormat::Yaml);
        assert_eq!(SpecFormat::from_path(Path::new("openapi.json")), SpecFormat::Json);
        assert_eq!(SpecFormat::from_path(Path::new("openapi")), SpecFormat::Auto);
    }

    #[test]
    fn test_auto_format_reads_both() {
        let json_doc = r#"{"openapi": "3.0.0", "paths": {}}"#;
        let yaml_doc = "openapi: 3.0.0\npaths: {}\n";
        assert_eq!(
            parse_document(json_doc, SpecFormat::Auto).unwrap(),
            parse_document(yaml_doc, SpecFormat::Auto).unwrap()
        );
    }

    #[test]
    fn test_document_checks() {
        let err = parse_document("- a\n- b\n", SpecFormat::Yaml).unwrap_err();
        assert!(err.to_string().contains("not a mapping"));
        let err = parse_document("openapi: 2.0\npaths: {}\n", SpecFormat::Yaml).unwrap_err();
        assert!(matches!(err, SpecLoadError::InvalidDocument { .. }));
        let err = parse_document("openapi: 3.0.0\ninfo: {}\n", SpecFormat::Yaml).unwrap_err();
        assert!(err.to_string().contains("paths"));
        let err = parse_document("{not json", SpecFormat::Json).unwrap_err();
        assert!(matches!(err, SpecLoadError::Json(_)));
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash("abc").len(), 16);
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(content_hash("abc"), "ba7816bf8f01cfea");
    }
}
