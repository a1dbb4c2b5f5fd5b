//! Validation issues and their aggregation.
//!
//! Request and response validation never stop at the first problem: every violation is
//! recorded as a [`ValidationIssue`] and handed back as a list (collect mode) or wrapped
//! in one [`ValidationErrors`] value (fail-fast mode).

use jsonschema::error::ValidationErrorKind;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};
use tracing::warn;

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A required parameter, property or body is absent
    MissingRequired,
    /// A value has a different type than declared
    TypeMismatch,
    /// A value is not one of the declared `enum` members
    EnumViolation,
    /// An object carries a property the schema forbids
    UnknownField,
    /// The body could not be decoded for its media type
    MalformedBody,
    /// The content type is not declared for the operation or response
    MediaTypeNotFound,
    /// No path template in the document matches the URL
    PathNotFound,
    /// The path exists but declares no operation for the method
    OperationNotFound,
    /// No response is declared for the status code
    ResponseNotFound,
    /// Any other schema keyword violation
    Schema,
}

impl Display for IssueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueKind::MissingRequired => "MissingRequired",
            IssueKind::TypeMismatch => "TypeMismatch",
            IssueKind::EnumViolation => "EnumViolation",
            IssueKind::UnknownField => "UnknownField",
            IssueKind::MalformedBody => "MalformedBody",
            IssueKind::MediaTypeNotFound => "MediaTypeNotFound",
            IssueKind::PathNotFound => "PathNotFound",
            IssueKind::OperationNotFound => "OperationNotFound",
            IssueKind::ResponseNotFound => "ResponseNotFound",
            IssueKind::Schema => "Schema",
        };
        f.write_str(s)
    }
}

/// A single violation found while validating a request or response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Where the issue was found, e.g. `query.informal` or `body`
    pub location: String,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        ValidationIssue {
            location: location.into(),
            kind,
            message: message.into(),
        }
    }

}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Map a `jsonschema` error kind onto an [`IssueKind`].
#[must_use]
pub fn classify_schema_error(kind: &ValidationErrorKind) -> IssueKind {
    match kind {
        ValidationErrorKind::Type { .. } => IssueKind::TypeMismatch,
        ValidationErrorKind::Required { .. } => IssueKind::MissingRequired,
        ValidationErrorKind::Enum { .. } => IssueKind::EnumViolation,
        ValidationErrorKind::AdditionalProperties { .. }
        | ValidationErrorKind::UnevaluatedProperties { .. } => IssueKind::UnknownField,
        _ => IssueKind::Schema,
    }
}

/// Aggregated validation failure carrying every issue found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrors {
    /// What was validated: `request` or `response`
    pub target: &'static str,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn new(target: &'static str, issues: Vec<ValidationIssue>) -> Self {
        Self { target, issues }
    }

    /// True if any issue has the given kind.
    #[must_use]
    pub fn has_kind(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    /// Problem body for host error middleware.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let details: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        let title = if self.target == "response" {
            "Response validation failed"
        } else {
            "Request validation failed"
        };
        json!({ "error": title, "details": details })
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OpenAPI {} validation failed. {} issue(s) found",
            self.target,
            self.issues.len()
        )?;
        for issue in &self.issues {
            write!(f, "\n{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Emit one warning event per issue.
pub fn log_issues(target: &str, issues: &[ValidationIssue]) {
    for issue in issues {
        warn!(
            target_kind = target,
            location = %issue.location,
            kind = %issue.kind,
            message = %issue.message,
            "Validation issue"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_schema_errors() {
        assert_eq!(
            classify_schema_error(&ValidationErrorKind::Required {
                property: json!("greeting")
            }),
            IssueKind::MissingRequired
        );
        assert_eq!(
            classify_schema_error(&ValidationErrorKind::Enum {
                options: json!(["en", "de"])
            }),
            IssueKind::EnumViolation
        );
        assert_eq!(
            classify_schema_error(&ValidationErrorKind::AdditionalProperties {
                unexpected: vec!["extra".to_string()]
            }),
            IssueKind::UnknownField
        );
        assert_eq!(
            classify_schema_error(&ValidationErrorKind::UnevaluatedProperties {
                unexpected: vec!["extra".to_string()]
            }),
            IssueKind::UnknownField
        );
        assert_eq!(
            classify_schema_error(&ValidationErrorKind::UniqueItems),
            IssueKind::Schema
        );
    }

    #[test]
    fn test_errors_display_lists_all_issues() {
        let errors = ValidationErrors::new(
            "request",
            vec![
                ValidationIssue::new("query.informal", IssueKind::TypeMismatch, "not a boolean"),
                ValidationIssue::new("body", IssueKind::MissingRequired, "body is required"),
            ],
        );
        let text = errors.to_string();
        assert!(text.contains("2 issue(s) found"));
        assert!(text.contains("[TypeMismatch] query.informal: not a boolean"));
        assert!(text.contains("[MissingRequired] body: body is required"));
        assert!(errors.has_kind(IssueKind::MissingRequired));
        assert!(!errors.has_kind(IssueKind::UnknownField));
    }

    #[test]
    fn test_to_json_problem_body() {
        let errors = ValidationErrors::new(
            "response",
            vec![ValidationIssue::new("body", IssueKind::Schema, "bad")],
        );
        let body = errors.to_json();
        assert_eq!(body["error"], "Response validation failed");
        assert_eq!(body["details"][0], "[Schema] body: bad");
    }
}
