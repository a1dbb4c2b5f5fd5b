use regex::Regex;
use std::collections::HashMap;

/// Compiled matcher for one OpenAPI path template.
///
/// Templates like `/greet/{lang}` become `^(?:/api/v1)?/greet/([^/]+)$`: literal text is
/// escaped, every `{name}` captures one segment, and the server base path is optional so
/// hosts that strip their mount prefix still match.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    template: String,
    regex: Regex,
    param_names: Vec<String>,
}

impl PathMatcher {
    /// Compile `template` under `base_path`.
    ///
    /// # Errors
    ///
    /// Only if the generated pattern exceeds the regex size limits.
    pub fn new(base_path: &str, template: &str) -> Result<Self, regex::Error> {
        let mut pattern = String::with_capacity(base_path.len() + template.len() + 16);
        pattern.push('^');

        let base = base_path.trim_end_matches('/');
        if !base.is_empty() {
            pattern.push_str("(?:");
            pattern.push_str(&regex::escape(base));
            pattern.push_str(")?");
        }

        let mut param_names = Vec::with_capacity(template.matches('{').count());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            pattern.push_str(&regex::escape(&rest[..open]));
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                // unterminated brace is literal text
                pattern.push_str(&regex::escape(&rest[open..]));
                rest = "";
                break;
            };
            param_names.push(after[..close].to_string());
            pattern.push_str("([^/]+)");
            rest = &after[close + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');

        Ok(Self {
            template: template.to_string(),
            regex: Regex::new(&pattern)?,
            param_names,
        })
    }

    /// The path template this matcher was built from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in template order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// True when the template has no parameters. Literal templates are tried first.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.param_names.is_empty()
    }

    /// Match a URL path, returning percent-decoded path parameter values.
    ///
    /// A name repeated in the template keeps its last value.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        let mut params = HashMap::with_capacity(self.param_names.len());
        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(m) = captures.get(i + 1) {
                let raw = m.as_str();
                let value = urlencoding::decode(raw)
                    .map_or_else(|_| raw.to_string(), |decoded| decoded.into_owned());
                params.insert(name.clone(), value);
            }
        }
        Some(params)
    }
}
