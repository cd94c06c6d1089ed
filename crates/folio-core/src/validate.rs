//! Pure request validation helpers.
//!
//! Everything in this module is a stateless function over an already-parsed
//! JSON body or query string value. Validators collect [`FieldError`]s and
//! never panic or return early; callers union the results and decide whether
//! to reject.
//!
//! [`validate_pagination`] is deliberately permissive: it reports errors but
//! always hands back usable defaults, and callers in this codebase proceed
//! with the defaults rather than rejecting. See the function docs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The offending field name.
    pub field: String,
    /// What was wrong with it.
    pub message: String,
}

impl FieldError {
    /// Creates a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Pagination parameters resolved from query-string input.
///
/// `errors` is non-empty when the raw input was invalid, but `limit` and
/// `offset` are always usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    /// Page size, within `[1, 100]`. Defaults to 20.
    pub limit: u32,
    /// Zero-based item offset. Defaults to 0.
    pub offset: u32,
    /// Errors reported against the raw input, if any.
    pub errors: Vec<FieldError>,
}

/// Default page size when none (or an invalid one) is supplied.
pub const DEFAULT_LIMIT: u32 = 20;
/// Largest accepted page size.
pub const MAX_LIMIT: u32 = 100;

/// Checks that each named field is present, non-null, and not an empty string.
#[must_use]
pub fn validate_required(body: &Value, fields: &[&str]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for field in fields {
        let missing = match body.get(field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if missing {
            errors.push(FieldError::new(*field, format!("{field} is required")));
        }
    }
    errors
}

/// Checks that a string's character length is within `[min, max]`.
#[must_use]
pub fn validate_string_length(
    value: &str,
    min: usize,
    max: usize,
    field: &str,
) -> Option<FieldError> {
    let len = value.chars().count();
    if len < min {
        Some(FieldError::new(
            field,
            format!("{field} must be at least {min} characters"),
        ))
    } else if len > max {
        Some(FieldError::new(
            field,
            format!("{field} must be at most {max} characters"),
        ))
    } else {
        None
    }
}

/// Checks the canonical 8-4-4-4-12 lowercase-or-uppercase hex UUID shape.
///
/// Other UUID encodings (simple, braced, URN) are rejected; keys in the
/// store always use the canonical form.
#[must_use]
pub fn validate_uuid(value: &str, field: &str) -> Option<FieldError> {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let mut parts = value.split('-');
    let ok = GROUPS.iter().all(|&len| {
        parts.next().is_some_and(|part| {
            part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit())
        })
    }) && parts.next().is_none();

    if ok {
        None
    } else {
        Some(FieldError::new(
            field,
            format!("{field} must be a valid UUID"),
        ))
    }
}

/// Checks a standard `local@domain` email shape.
#[must_use]
pub fn validate_email(value: &str, field: &str) -> Option<FieldError> {
    let invalid = || {
        Some(FieldError::new(
            field,
            format!("{field} must be a valid email address"),
        ))
    };

    let Some((local, domain)) = value.split_once('@') else {
        return invalid();
    };
    if local.is_empty() || domain.is_empty() || value.contains(' ') {
        return invalid();
    }
    // Domain needs at least one dot with non-empty labels on each side.
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return invalid();
    }
    None
}

/// Resolves pagination from raw query-string values.
///
/// Invalid input is reported in `errors` but replaced with the defaults
/// (`limit=20, offset=0`) rather than rejected here. Callers may choose to
/// 400 on `!errors.is_empty()`; the routes in this codebase proceed with
/// the defaults, which keeps listing endpoints tolerant of sloppy clients.
#[must_use]
pub fn validate_pagination(limit: Option<&str>, offset: Option<&str>) -> Pagination {
    let mut errors = Vec::new();

    let limit = match limit {
        None => DEFAULT_LIMIT,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if (1..=MAX_LIMIT).contains(&n) => n,
            _ => {
                errors.push(FieldError::new(
                    "limit",
                    format!("limit must be an integer between 1 and {MAX_LIMIT}"),
                ));
                DEFAULT_LIMIT
            }
        },
    };

    let offset = match offset {
        None => 0,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) => n,
            _ => {
                errors.push(FieldError::new(
                    "offset",
                    "offset must be a non-negative integer",
                ));
                0
            }
        },
    };

    Pagination {
        limit,
        offset,
        errors,
    }
}

/// Validates a signup request body.
#[must_use]
pub fn validate_signup(body: &Value) -> Vec<FieldError> {
    let mut errors = validate_required(body, &["name", "email", "password"]);
    if let Some(email) = body.get("email").and_then(Value::as_str) {
        errors.extend(validate_email(email, "email"));
    }
    if let Some(password) = body.get("password").and_then(Value::as_str) {
        errors.extend(validate_string_length(password, 8, 128, "password"));
    }
    errors
}

/// Validates a draft create/update body.
#[must_use]
pub fn validate_draft(body: &Value) -> Vec<FieldError> {
    let mut errors = validate_required(body, &["title", "content"]);
    if let Some(title) = body.get("title").and_then(Value::as_str) {
        errors.extend(validate_string_length(title, 1, 200, "title"));
    }
    errors
}

/// Validates an exhibit body.
#[must_use]
pub fn validate_exhibit(body: &Value) -> Vec<FieldError> {
    let mut errors = validate_required(body, &["title"]);
    if let Some(title) = body.get("title").and_then(Value::as_str) {
        errors.extend(validate_string_length(title, 1, 200, "title"));
    }
    errors
}

/// Validates a new editorial submission body.
#[must_use]
pub fn validate_submission(body: &Value) -> Vec<FieldError> {
    let mut errors = validate_required(body, &["title", "content", "genre"]);
    if let Some(title) = body.get("title").and_then(Value::as_str) {
        errors.extend(validate_string_length(title, 1, 200, "title"));
    }
    if let Some(content) = body.get("content").and_then(Value::as_str) {
        errors.extend(validate_string_length(content, 1, 100_000, "content"));
    }
    errors
}
