//! # Runtime Configuration Module
//!
//! Environment variable based configuration for request handling.
//!
//! ## Environment Variables
//!
//! ### `APIPRIMED_MAX_BODY_BYTES`
//!
//! Largest request body read into memory. Accepts decimal (`1048576`) or hexadecimal
//! (`0x100000`). Default: 10 MiB. Larger bodies are rejected before validation.
//!
//! ### `APIPRIMED_VALIDATE_RESPONSES`
//!
//! `true` makes [`ApiPrimed`](crate::app::ApiPrimed) validate every handler response
//! against the declared responses. Default: `false`.
//!
//! ### `APIPRIMED_VALIDATE_FORMATS`
//!
//! `false` disables JSON Schema `format` assertions (`date-time`, `email`, ...) when the
//! spec is compiled. Default: `true`.
//!
//! ## Usage
//!
//! ```rust
//! use apiprimed::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Body limit: {} bytes", config.max_body_bytes);
//! ```

use crate::spec::CompileOptions;
use std::env;

/// Default request body limit: 10 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Request body limit in bytes
    pub max_body_bytes: usize,
    /// Validate handler responses in [`ApiPrimed`](crate::app::ApiPrimed)
    pub validate_responses: bool,
    /// Assert JSON Schema `format` keywords
    pub validate_formats: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            validate_responses: false,
            validate_formats: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let max_body_bytes = match lookup("APIPRIMED_MAX_BODY_BYTES") {
            Some(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(DEFAULT_MAX_BODY_BYTES)
                } else {
                    val.parse().unwrap_or(DEFAULT_MAX_BODY_BYTES)
                }
            }
            None => DEFAULT_MAX_BODY_BYTES,
        };
        RuntimeConfig {
            max_body_bytes,
            validate_responses: lookup("APIPRIMED_VALIDATE_RESPONSES")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.validate_responses),
            validate_formats: lookup("APIPRIMED_VALIDATE_FORMATS")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.validate_formats),
        }
    }

    /// Options for compiling a spec under this configuration.
    #[must_use]
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            validate_formats: self.validate_formats,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), RuntimeConfig::default());
        assert_eq!(config(&[]).max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_body_limit_hex_and_decimal() {
        assert_eq!(config(&[("APIPRIMED_MAX_BODY_BYTES", "0x400")]).max_body_bytes, 1024);
        assert_eq!(config(&[("APIPRIMED_MAX_BODY_BYTES", "2048")]).max_body_bytes, 2048);
        assert_eq!(
            config(&[("APIPRIMED_MAX_BODY_BYTES", "lots")]).max_body_bytes,
            DEFAULT_MAX_BODY_BYTES
        );
    }

    #[test]
    fn test_flags() {
        let c = config(&[
            ("APIPRIMED_VALIDATE_RESPONSES", "true"),
            ("APIPRIMED_VALIDATE_FORMATS", "0"),
        ]);
        assert!(c.validate_responses);
        assert!(!c.validate_formats);
        assert!(!c.compile_options().validate_formats);
        assert!(!config(&[("APIPRIMED_VALIDATE_RESPONSES", "maybe")]).validate_responses);
    }
}
