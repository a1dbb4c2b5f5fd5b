//! Casting raw request/response data into typed JSON values.
//!
//! Parameters arrive as strings and are converted according to their schema type and
//! serialization style. Bodies are decoded according to their media type. Object
//! defaults declared in a schema are filled in before validation.

use crate::spec::{mime_essence, ParameterMeta, ParameterStyle};
use serde_json::{Map, Number, Value};

/// The primary `type` of a schema. For `type: [T, "null"]` this is `T`.
#[must_use]
pub fn schema_type(schema: Option<&Value>) -> Option<&str> {
    match schema?.get("type")? {
        Value::String(ty) => Some(ty.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn accepts_null(schema: Option<&Value>) -> bool {
    match schema.and_then(|s| s.get("type")) {
        Some(Value::Array(types)) => types.iter().any(|t| t == "null"),
        _ => false,
    }
}

/// Convert one scalar string according to its schema type.
///
/// # Errors
///
/// Returns a message when the string is not a valid value of the declared type.
pub fn cast_primitive(val: &str, schema: Option<&Value>) -> Result<Value, String> {
    if val == "null" && accepts_null(schema) {
        return Ok(Value::Null);
    }
    match schema_type(schema) {
        Some("integer") => val
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{val}' is not a valid integer")),
        Some("number") => {
            let trimmed = val.trim();
            if let Ok(int) = trimmed.parse::<i64>() {
                return Ok(Value::from(int));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{val}' is not a valid number"))
        }
        Some("boolean") => match val.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("'{val}' is not a valid boolean")),
        },
        _ => Ok(Value::String(val.to_string())),
    }
}

/// Decode a parameter from its raw value(s).
///
/// `values` holds every occurrence of the parameter (query parameters may repeat). An
/// exploded array in `form` style arrives as repeats, so a single occurrence is a
/// single item; other arrays are split on the style's delimiter. Objects accept JSON, `k,v,k,v` (not exploded) and `k=v,k=v`
/// (exploded).
///
/// # Errors
///
/// Returns a message describing the first value that does not cast.
pub fn decode_param_value(values: &[String], meta: &ParameterMeta) -> Result<Value, String> {
    let Some(first) = values.first() else {
        return Err(format!("no value supplied for '{}'", meta.name));
    };

    if meta.json_content {
        return serde_json::from_str(first)
            .map_err(|e| format!("'{}' is not valid JSON: {e}", meta.name));
    }

    let schema = meta.schema();
    let raw = strip_style_prefix(first, &meta.name, meta.style);

    match schema_type(schema) {
        Some("array") => {
            let items_schema = schema.and_then(|s| s.get("items"));
            let parts: Vec<String> = if values.len() > 1 {
                values
                    .iter()
                    .map(|v| strip_style_prefix(v, &meta.name, meta.style).to_string())
                    .collect()
            } else if meta.style == ParameterStyle::Form && meta.explode {
                vec![raw.to_string()]
            } else {
                let delim = match meta.style {
                    ParameterStyle::SpaceDelimited => ' ',
                    ParameterStyle::PipeDelimited => '|',
                    ParameterStyle::Label if meta.explode => '.',
                    _ => ',',
                };
                raw.split(delim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            };
            parts
                .iter()
                .map(|p| cast_primitive(p.trim(), items_schema))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        Some("object") => {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(raw) {
                return Ok(value);
            }
            decode_object_pairs(raw, meta.explode, schema)
                .ok_or_else(|| format!("'{raw}' is not a valid object for '{}'", meta.name))
        }
        _ => cast_primitive(raw, schema),
    }
}

fn strip_style_prefix<'a>(raw: &'a str, name: &str, style: ParameterStyle) -> &'a str {
    match style {
        ParameterStyle::Label => raw.strip_prefix('.').unwrap_or(raw),
        ParameterStyle::Matrix => raw
            .strip_prefix(';')
            .and_then(|r| r.strip_prefix(name))
            .and_then(|r| r.strip_prefix('='))
            .unwrap_or(raw),
        _ => raw,
    }
}

fn decode_object_pairs(raw: &str, explode: bool, schema: Option<&Value>) -> Option<Value> {
    let properties = schema.and_then(|s| s.get("properties"));
    let mut out = Map::new();
    if explode {
        for pair in raw.split(',').filter(|p| !p.is_empty()) {
            let (k, v) = pair.split_once('=')?;
            let value = cast_primitive(v, properties.and_then(|p| p.get(k))).ok()?;
            out.insert(k.to_string(), value);
        }
    } else {
        let tokens: Vec<&str> = raw.split(',').collect();
        if tokens.len() % 2 != 0 {
            return None;
        }
        for chunk in tokens.chunks(2) {
            let (k, v) = (chunk[0], chunk[1]);
            let value = cast_primitive(v, properties.and_then(|p| p.get(k))).ok()?;
            out.insert(k.to_string(), value);
        }
    }
    Some(Value::Object(out))
}

/// True for `application/json` and `+json` structured syntax types.
#[must_use]
pub fn is_json_media_type(mimetype: &str) -> bool {
    let essence = mime_essence(mimetype);
    essence == "application/json" || essence.ends_with("+json")
}

/// Decode a body for `media_type`.
///
/// JSON types are parsed, `application/x-www-form-urlencoded` becomes an object with
/// fields cast per the schema's properties, and anything else is taken as text.
///
/// # Errors
///
/// Returns a message when the bytes are not valid for the media type.
pub fn decode_body(data: &[u8], media_type: &str, schema: Option<&Value>) -> Result<Value, String> {
    let essence = mime_essence(media_type);
    if is_json_media_type(&essence) {
        return serde_json::from_slice(data).map_err(|e| format!("Malformed JSON body: {e}"));
    }
    if essence == "application/x-www-form-urlencoded" {
        return Ok(decode_form(data, schema));
    }
    if essence.starts_with("text/") {
        return std::str::from_utf8(data)
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| format!("Body is not valid UTF-8 text: {e}"));
    }
    Ok(Value::String(String::from_utf8_lossy(data).to_string()))
}

fn decode_form(data: &[u8], schema: Option<&Value>) -> Value {
    let properties = schema.and_then(|s| s.get("properties"));
    let mut grouped: Map<String, Value> = Map::new();
    let mut raw: Vec<(String, Vec<String>)> = Vec::new();
    for (k, v) in url::form_urlencoded::parse(data) {
        match raw.iter_mut().find(|(name, _)| *name == k) {
            Some((_, values)) => values.push(v.into_owned()),
            None => raw.push((k.into_owned(), vec![v.into_owned()])),
        }
    }
    for (name, values) in raw {
        let prop_schema = properties.and_then(|p| p.get(&name));
        let value = if schema_type(prop_schema) == Some("array") {
            let items = prop_schema.and_then(|s| s.get("items"));
            Value::Array(
                values
                    .iter()
                    .map(|v| cast_primitive(v, items).unwrap_or_else(|_| Value::String(v.clone())))
                    .collect(),
            )
        } else {
            // first occurrence wins for scalars; a failed cast is left for the schema check
            let first = values.first().cloned().unwrap_or_default();
            cast_primitive(&first, prop_schema).unwrap_or(Value::String(first))
        };
        grouped.insert(name, value);
    }
    Value::Object(grouped)
}

/// Fill declared `default`s into objects missing those properties, recursively.
pub fn apply_defaults(value: &mut Value, schema: &Value) {
    if let Some(all_of) = schema.get("allOf").and_then(Value::as_array) {
        for sub in all_of {
            apply_defaults(value, sub);
        }
    }
    match value {
        Value::Object(obj) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (name, prop_schema) in properties {
                match obj.get_mut(name) {
                    Some(child) => apply_defaults(child, prop_schema),
                    None => {
                        if let Some(default) = prop_schema.get("default") {
                            obj.insert(name.clone(), default.clone());
                        }
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(items_schema) = schema.get("items") {
                for item in items {
                    apply_defaults(item, items_schema);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ParameterLocation;
    use serde_json::json;

    fn param(style: ParameterStyle, explode: bool, schema: Value) -> ParameterMeta {
        let validator = jsonschema::validator_for(&schema).unwrap();
        ParameterMeta {
            name: "p".to_string(),
            location: ParameterLocation::Query,
            required: false,
            style,
            explode,
            json_content: false,
            validator: Some(crate::spec::SchemaValidator::new(schema, validator)),
        }
    }

    fn vals(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cast_primitives() {
        assert_eq!(cast_primitive("42", Some(&json!({"type": "integer"}))), Ok(json!(42)));
        assert_eq!(cast_primitive("4.5", Some(&json!({"type": "number"}))), Ok(json!(4.5)));
        assert_eq!(cast_primitive("true", Some(&json!({"type": "boolean"}))), Ok(json!(true)));
        assert_eq!(cast_primitive("x", None), Ok(json!("x")));
        assert!(cast_primitive("yes", Some(&json!({"type": "boolean"}))).is_err());
        assert!(cast_primitive("4.5", Some(&json!({"type": "integer"}))).is_err());
        assert_eq!(
            cast_primitive("null", Some(&json!({"type": ["integer", "null"]}))),
            Ok(Value::Null)
        );
    }

    #[test]
    fn test_decode_arrays_by_style() {
        let schema = json!({"type": "array", "items": {"type": "integer"}});
        let form = param(ParameterStyle::Form, false, schema.clone());
        assert_eq!(decode_param_value(&vals(&["1,2,3"]), &form), Ok(json!([1, 2, 3])));
        let exploded = param(ParameterStyle::Form, true, schema.clone());
        assert_eq!(decode_param_value(&vals(&["1", "2"]), &exploded), Ok(json!([1, 2])));
        let pipes = param(ParameterStyle::PipeDelimited, false, schema.clone());
        assert_eq!(decode_param_value(&vals(&["4|5"]), &pipes), Ok(json!([4, 5])));
        let spaces = param(ParameterStyle::SpaceDelimited, false, schema.clone());
        assert_eq!(decode_param_value(&vals(&["6 7"]), &spaces), Ok(json!([6, 7])));
        let label = param(ParameterStyle::Label, false, schema.clone());
        assert_eq!(decode_param_value(&vals(&[".8,9"]), &label), Ok(json!([8, 9])));
        assert!(decode_param_value(&vals(&["1,x"]), &form).is_err());
    }

    #[test]
    fn test_exploded_form_array_keeps_commas() {
        let schema = json!({"type": "array", "items": {"type": "string"}});
        let exploded = param(ParameterStyle::Form, true, schema.clone());
        assert_eq!(decode_param_value(&vals(&["a,b"]), &exploded), Ok(json!(["a,b"])));
        assert_eq!(
            decode_param_value(&vals(&["a,b", "c"]), &exploded),
            Ok(json!(["a,b", "c"]))
        );
        let form = param(ParameterStyle::Form, false, schema);
        assert_eq!(decode_param_value(&vals(&["a,b"]), &form), Ok(json!(["a", "b"])));
    }

    #[test]
    fn test_decode_objects() {
        let schema = json!({
            "type": "object",
            "properties": {"r": {"type": "integer"}, "name": {"type": "string"}}
        });
        let simple = param(ParameterStyle::Simple, false, schema.clone());
        assert_eq!(
            decode_param_value(&vals(&["r,100,name,x"]), &simple),
            Ok(json!({"r": 100, "name": "x"}))
        );
        let exploded = param(ParameterStyle::Simple, true, schema.clone());
        assert_eq!(
            decode_param_value(&vals(&["r=1,name=y"]), &exploded),
            Ok(json!({"r": 1, "name": "y"}))
        );
        assert_eq!(
            decode_param_value(&vals(&[r#"{"r": 2}"#]), &simple),
            Ok(json!({"r": 2}))
        );
        assert!(decode_param_value(&vals(&["r,1,name"]), &simple).is_err());
    }

    #[test]
    fn test_matrix_prefix() {
        let m = param(ParameterStyle::Matrix, false, json!({"type": "integer"}));
        assert_eq!(decode_param_value(&vals(&[";p=5"]), &m), Ok(json!(5)));
    }

    #[test]
    fn test_decode_body_by_media_type() {
        assert_eq!(
            decode_body(br#"{"a":1}"#, "application/json; charset=utf-8", None),
            Ok(json!({"a": 1}))
        );
        assert_eq!(
            decode_body(br#"{"a":1}"#, "application/problem+json", None),
            Ok(json!({"a": 1}))
        );
        assert!(decode_body(b"{oops", "application/json", None).is_err());
        assert_eq!(decode_body(b"hi", "text/plain", None), Ok(json!("hi")));
        let schema = json!({"type": "object", "properties": {
            "n": {"type": "integer"},
            "tags": {"type": "array", "items": {"type": "string"}}
        }});
        assert_eq!(
            decode_body(b"n=3&tags=a&tags=b&x=y", "application/x-www-form-urlencoded", Some(&schema)),
            Ok(json!({"n": 3, "tags": ["a", "b"], "x": "y"}))
        );
    }

    #[test]
    fn test_apply_defaults_nested() {
        let schema = json!({
            "type": "object",
            "properties": {
                "punctuation": {"type": "string", "default": "!"},
                "inner": {
                    "type": "object",
                    "properties": {"level": {"type": "integer", "default": 1}}
                },
                "list": {
                    "type": "array",
                    "items": {"type": "object", "properties": {"k": {"default": 0}}}
                }
            }
        });
        let mut value = json!({"inner": {}, "list": [{}, {"k": 5}]});
        apply_defaults(&mut value, &schema);
        assert_eq!(
            value,
            json!({"inner": {"level": 1}, "list": [{"k": 0}, {"k": 5}], "punctuation": "!"})
        );
    }
}
