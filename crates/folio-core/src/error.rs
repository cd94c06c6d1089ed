//! The error taxonomy for the request pipeline.
//!
//! Every failure a route can produce is one of the [`FolioError`] variants.
//! The mapping to HTTP status codes and machine-readable codes is fixed:
//!
//! | Variant          | Code                  | Status |
//! |------------------|-----------------------|--------|
//! | `Validation`     | `VALIDATION_ERROR`    | 400    |
//! | `Authentication` | `UNAUTHORIZED`        | 401    |
//! | `Authorization`  | `FORBIDDEN`           | 403    |
//! | `NotFound`       | `NOT_FOUND`           | 404    |
//! | `Timeout`        | `TIMEOUT`             | 408    |
//! | `Conflict`       | `CONFLICT`            | 409    |
//! | `RateLimited`    | `RATE_LIMIT_EXCEEDED` | 429    |
//! | `Internal`       | `INTERNAL_ERROR`      | 500    |
//!
//! Validation failures are recovered locally into field-error lists and are
//! expected traffic; `Internal` is the only class whose details are logged
//! with full fidelity server-side and redacted from clients in production.

use crate::validate::FieldError;
use http::StatusCode;
use thiserror::Error;

/// Result type alias using [`FolioError`].
pub type FolioResult<T> = Result<T, FolioError>;

/// Standard error type for the Folio backend.
///
/// # Example
///
/// ```
/// use folio_core::FolioError;
///
/// fn load(id: &str) -> Result<(), FolioError> {
///     Err(FolioError::not_found_resource("draft", id))
/// }
/// ```
#[derive(Error, Debug)]
pub enum FolioError {
    /// Request validation failed.
    #[error("Validation failed")]
    Validation {
        /// Field-specific validation errors.
        field_errors: Vec<FieldError>,
    },

    /// Missing or unverifiable credentials.
    #[error("Authentication required: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// The caller is authenticated but not permitted.
    #[error("Forbidden: {message}")]
    Authorization {
        /// Human-readable error message.
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The type of resource that was not found.
        resource_type: Option<String>,
        /// The identifier of the resource.
        resource_id: Option<String>,
    },

    /// The request exceeded its deadline.
    #[error("Request timed out after {deadline_ms}ms")]
    Timeout {
        /// The configured deadline in milliseconds.
        deadline_ms: u64,
    },

    /// A concurrent update won the race.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
    },

    /// The caller exceeded the sliding-window rate limit.
    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds until the window admits this caller again.
        retry_after_seconds: u64,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error. Logged server-side, never sent to clients.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl FolioError {
    /// Creates a validation error from a list of field errors.
    #[must_use]
    pub fn validation(field_errors: Vec<FieldError>) -> Self {
        Self::Validation { field_errors }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
            resource_id: None,
        }
    }

    /// Creates a not found error carrying resource context.
    #[must_use]
    pub fn not_found_resource(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        Self::NotFound {
            message: format!("{resource_type} '{resource_id}' not found"),
            resource_type: Some(resource_type),
            resource_id: Some(resource_id),
        }
    }

    /// Creates a timeout error for the given deadline.
    #[must_use]
    pub const fn timeout(deadline_ms: u64) -> Self {
        Self::Timeout { deadline_ms }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a rate-limited error.
    #[must_use]
    pub const fn rate_limited(retry_after_seconds: u64) -> Self {
        Self::RateLimited {
            retry_after_seconds,
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with an underlying cause.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Authentication { .. } => "UNAUTHORIZED",
            Self::Authorization { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Conflict { .. } => "CONFLICT",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Self::Authorization { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true for the only class that warrants detailed server-side
    /// logging with stack context.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns extra detail attached to the failure envelope.
    ///
    /// The error handler only includes this outside production.
    #[must_use]
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation { field_errors } => serde_json::to_value(field_errors).ok(),
            Self::NotFound {
                resource_type: Some(rt),
                resource_id: Some(rid),
                ..
            } => Some(serde_json::json!({
                "resourceType": rt,
                "resourceId": rid
            })),
            Self::RateLimited {
                retry_after_seconds,
            } => Some(serde_json::json!({
                "retryAfterSeconds": retry_after_seconds
            })),
            Self::Internal {
                source: Some(source),
                ..
            } => Some(serde_json::json!({
                "cause": format!("{source:#}")
            })),
            _ => None,
        }
    }
}
