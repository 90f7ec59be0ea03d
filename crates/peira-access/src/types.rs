//! Access-control vocabulary: actions, resources, decisions.

use peira_core::PeiraError;
use serde::{Deserialize, Serialize};

/// Actions a caller can attempt, drawn from a closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Create a new resource.
    Create,
    /// Read an existing resource.
    Read,
    /// Modify an existing resource.
    Update,
    /// Delete an existing resource.
    Delete,
}

impl Action {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource types managed by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A project grouping suites, cases, and runs.
    Project,
    /// A suite of test cases.
    TestSuite,
    /// A single test case.
    TestCase,
    /// An execution of a suite or selection of cases.
    TestRun,
    /// A generated report over runs.
    Report,
}

impl ResourceType {
    /// Returns the canonical snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::TestSuite => "test_suite",
            Self::TestCase => "test_case",
            Self::TestRun => "test_run",
            Self::Report => "report",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a check denied the request.
///
/// The wire names match the platform's API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenialReason {
    /// No authenticated session.
    #[serde(rename = "unauthenticated")]
    Unauthenticated,
    /// The session's email address is not verified.
    #[serde(rename = "unverified")]
    Unverified,
    /// The route requires a completed two-factor challenge.
    #[serde(rename = "2fa-required")]
    TwoFactorRequired,
    /// The session's role does not permit the action.
    #[serde(rename = "role-forbidden")]
    RoleForbidden,
    /// The caller is neither the owner nor a team member.
    #[serde(rename = "not-owner")]
    NotOwner,
}

impl DenialReason {
    /// Returns the wire name of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Unverified => "unverified",
            Self::TwoFactorRequired => "2fa-required",
            Self::RoleForbidden => "role-forbidden",
            Self::NotOwner => "not-owner",
        }
    }

    /// A user-safe sentence describing the denial.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unauthenticated => "Authentication is required",
            Self::Unverified => "Email verification is required",
            Self::TwoFactorRequired => "Two-factor authentication is required",
            Self::RoleForbidden => "Your role does not permit this action",
            Self::NotOwner => "Only the owner or a team member may do this",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to the resource an action targets.
///
/// Collection-level operations (create, list) carry no id; ownership
/// checks only apply when an id is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// The resource type.
    pub resource: ResourceType,
    /// The specific resource instance, when the action targets one.
    pub id: Option<String>,
}

impl ResourceRef {
    /// References the resource collection (no specific instance).
    #[must_use]
    pub const fn collection(resource: ResourceType) -> Self {
        Self { resource, id: None }
    }

    /// References a specific resource instance.
    #[must_use]
    pub fn item(resource: ResourceType, id: impl Into<String>) -> Self {
        Self {
            resource,
            id: Some(id.into()),
        }
    }
}

/// The owning party of a resource, supplied by the ownership lookup
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    /// The creating user.
    pub owner_id: String,
    /// Team members granted the same mutation rights as the owner.
    pub team_member_ids: Vec<String>,
}

impl Ownership {
    /// Whether the subject is the owner or a team member.
    #[must_use]
    pub fn permits(&self, subject_id: &str) -> bool {
        self.owner_id == subject_id || self.team_member_ids.iter().any(|id| id == subject_id)
    }
}

/// Outcome of an access check. Computed fresh per check, never stored.
///
/// Constructed only through [`AccessDecision::allow`] and
/// [`AccessDecision::deny`], so a denial always carries its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// The action that was checked.
    pub action: Action,
    /// The resource type that was checked.
    pub resource: ResourceType,
    /// Whether the action is permitted.
    pub allowed: bool,
    /// The first failing check, when denied.
    pub reason: Option<DenialReason>,
}

impl AccessDecision {
    /// An allow decision.
    #[must_use]
    pub const fn allow(action: Action, resource: ResourceType) -> Self {
        Self {
            action,
            resource,
            allowed: true,
            reason: None,
        }
    }

    /// A deny decision with its reason.
    #[must_use]
    pub const fn deny(action: Action, resource: ResourceType, reason: DenialReason) -> Self {
        Self {
            action,
            resource,
            allowed: false,
            reason: Some(reason),
        }
    }

    /// Whether the action is permitted.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Converts a denial into the pipeline error it raises.
    ///
    /// Returns `None` for allow decisions.
    #[must_use]
    pub fn into_error(self) -> Option<PeiraError> {
        let reason = self.reason?;
        Some(PeiraError::access_denied(reason.message(), reason.as_str()))
    }
}
