//! Caller identity types.
//!
//! A [`Caller`] is the resolved identity for one request: either a full
//! [`Session`] produced from a valid credential, or [`Caller::Anonymous`]
//! when no credential was supplied. There is no in-between state; the
//! session resolver rejects partially-populated claims before a `Session`
//! is ever constructed.

use serde::{Deserialize, Serialize};

/// Roles a session can carry, drawn from a closed enumeration.
///
/// Roles are ordered by capability for display purposes only; the
/// permission table in `peira-access` is the single source of truth for
/// what each role may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control over all resources.
    Admin,
    /// Creates and maintains test content.
    Editor,
    /// Read-only access to projects and reports.
    Viewer,
}

impl Role {
    /// Returns the canonical lowercase name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            "viewer" => Ok(Self::Viewer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A resolved caller identity for one request.
///
/// Created per-request by the session resolver from a credential and
/// discarded at the end of the request. Persistence of the underlying
/// account is an external collaborator's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Stable subject identifier (never empty).
    pub subject_id: String,
    /// The caller's role.
    pub role: Role,
    /// Email address associated with the account, if known.
    pub email: Option<String>,
    /// Whether the account's email address has been verified.
    pub email_verified: bool,
    /// Whether the account has two-factor authentication enabled.
    pub two_factor_enabled: bool,
    /// Whether the two-factor challenge was completed for this session.
    ///
    /// Carried as a claim in the session token; the authentication edge
    /// sets it when the challenge completes.
    pub two_factor_authenticated: bool,
}

impl Session {
    /// Creates a session with the given subject and role.
    ///
    /// All verification flags default to `false`.
    #[must_use]
    pub fn new(subject_id: impl Into<String>, role: Role) -> Self {
        Self {
            subject_id: subject_id.into(),
            role,
            email: None,
            email_verified: false,
            two_factor_enabled: false,
            two_factor_authenticated: false,
        }
    }

    /// Returns a session with the given email, marked verified.
    #[must_use]
    pub fn with_verified_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self.email_verified = true;
        self
    }

    /// Returns a session with two-factor enabled and completed.
    #[must_use]
    pub fn with_two_factor_complete(mut self) -> Self {
        self.two_factor_enabled = true;
        self.two_factor_authenticated = true;
        self
    }
}

/// The caller associated with one request: a session or nobody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Caller {
    /// An authenticated caller with a fully-populated session.
    Session(Session),
    /// No credential was supplied.
    Anonymous,
}

impl Caller {
    /// Returns the session, if the caller is authenticated.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Session(session) => Some(session),
            Self::Anonymous => None,
        }
    }

    /// Returns `true` when no credential was supplied.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never includes secrets or tokens.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::Session(session) => format!("user:{}", session.subject_id),
            Self::Anonymous => "anonymous".to_string(),
        }
    }
}

impl Default for Caller {
    fn default() -> Self {
        Self::Anonymous
    }
}
