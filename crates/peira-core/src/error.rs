//! Error taxonomy and normalization.
//!
//! [`PeiraError`] is the closed failure taxonomy for the whole pipeline.
//! Every failure raised by a step, the gate, the resolver, or a handler is
//! one of its variants, and [`PeiraError::normalize`] is the single place
//! where a failure becomes a client-visible [`NormalizedError`].
//!
//! Normalization never raises. Internal kinds (`Application`, `Database`,
//! `Unexpected`) are logged with their original message and surfaced with
//! a generic one; the remaining kinds carry user-safe messages as-is.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`PeiraError`].
pub type PeiraResult<T> = Result<T, PeiraError>;

/// Failure kinds, matching the variants of [`PeiraError`] one-to-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing-where-required or structurally invalid credential.
    Authentication,
    /// Malformed request input.
    Validation,
    /// RBAC denial.
    AccessDenied,
    /// Rate limit exceeded.
    RateLimited,
    /// Generic handler failure.
    Application,
    /// Collaborator storage failure.
    Database,
    /// Fallback for anything else.
    Unexpected,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Application | Self::Database | Self::Unexpected => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the original error message is safe to return to clients.
    #[must_use]
    pub const fn message_is_user_safe(self) -> bool {
        matches!(
            self,
            Self::Authentication | Self::Validation | Self::AccessDenied | Self::RateLimited
        )
    }

    /// Returns the wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Validation => "validation",
            Self::AccessDenied => "access_denied",
            Self::RateLimited => "rate_limited",
            Self::Application => "application",
            Self::Database => "database",
            Self::Unexpected => "unexpected",
        }
    }
}

/// Standard error type for the Peira pipeline.
///
/// # Example
///
/// ```
/// use peira_core::{PeiraError, ErrorKind};
///
/// fn check_name(name: &str) -> Result<(), PeiraError> {
///     if name.is_empty() {
///         return Err(PeiraError::validation("name must not be empty"));
///     }
///     Ok(())
/// }
///
/// assert_eq!(check_name("").unwrap_err().kind(), ErrorKind::Validation);
/// ```
#[derive(Error, Debug)]
pub enum PeiraError {
    /// A credential was required but absent, or present but invalid.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Human-readable, user-safe message.
        message: String,
    },

    /// Request input was malformed.
    #[error("validation failed: {message}")]
    Validation {
        /// Human-readable, user-safe message.
        message: String,
    },

    /// An access-control check denied the request.
    #[error("access denied: {message}")]
    AccessDenied {
        /// Human-readable, user-safe message.
        message: String,
        /// Machine-readable denial reason (e.g. `role-forbidden`).
        reason: Option<String>,
    },

    /// Rate limit exceeded.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Human-readable, user-safe message.
        message: String,
        /// Milliseconds until requests are allowed again.
        retry_after_ms: Option<u64>,
    },

    /// Generic handler failure. Message is internal-only.
    #[error("application error: {message}")]
    Application {
        /// Internal message; never returned to clients.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Collaborator storage failure. Message is internal-only.
    #[error("database error: {message}")]
    Database {
        /// Internal message; never returned to clients.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Fallback for failures outside the taxonomy. Message is internal-only.
    #[error("unexpected error: {message}")]
    Unexpected {
        /// Internal message; never returned to clients.
        message: String,
    },
}

impl PeiraError {
    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an access-denied error with a machine-readable reason.
    #[must_use]
    pub fn access_denied(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
            reason: Some(reason.into()),
        }
    }

    /// Creates a rate-limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>, retry_after_ms: Option<u64>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_ms,
        }
    }

    /// Creates an application error.
    #[must_use]
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an application error wrapping a source error.
    pub fn application_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Application {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a database error.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a database error wrapping a source error.
    pub fn database_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates an unexpected error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Application { .. } => ErrorKind::Application,
            Self::Database { .. } => ErrorKind::Database,
            Self::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Converts this failure into its canonical client-visible form.
    ///
    /// This function never raises. Internal kinds are logged with their
    /// original message through the logging collaborator and surfaced
    /// with a generic message instead.
    #[must_use]
    pub fn normalize(&self) -> NormalizedError {
        let kind = self.kind();
        let message = if kind.message_is_user_safe() {
            self.user_message()
        } else {
            tracing::error!(error = %self, kind = kind.as_str(), "internal failure normalized");
            "An internal error occurred".to_string()
        };

        NormalizedError {
            kind,
            message,
            status: kind.status_code().as_u16(),
            code: self.machine_code(),
            retry_after_ms: match self {
                Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
                _ => None,
            },
        }
    }

    /// The message as shown to clients for user-safe kinds.
    fn user_message(&self) -> String {
        match self {
            Self::Authentication { message }
            | Self::Validation { message }
            | Self::AccessDenied { message, .. }
            | Self::RateLimited { message, .. }
            | Self::Application { message, .. }
            | Self::Database { message, .. }
            | Self::Unexpected { message } => message.clone(),
        }
    }

    /// Optional machine-readable code for the envelope.
    fn machine_code(&self) -> Option<String> {
        match self {
            Self::AccessDenied { reason, .. } => reason.clone(),
            _ => None,
        }
    }
}

/// Canonical failure representation surfaced to clients.
///
/// Terminal: converted directly to a response by the chain runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedError {
    /// The failure kind.
    pub kind: ErrorKind,
    /// User-safe message.
    pub message: String,
    /// HTTP-equivalent status code.
    pub status: u16,
    /// Optional machine-readable code (e.g. an RBAC denial reason).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Milliseconds until requests are allowed again, for rate limits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl NormalizedError {
    /// Converts into the stable wire envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                kind: self.kind,
                message: self.message.clone(),
                code: self.code.clone(),
            },
            status: self.status,
        }
    }
}

/// Serializable error envelope, stable across all failure paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorBody,
    /// HTTP-equivalent status code.
    pub status: u16,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The failure kind.
    pub kind: ErrorKind,
    /// User-safe message.
    pub message: String,
    /// Optional machine-readable code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
