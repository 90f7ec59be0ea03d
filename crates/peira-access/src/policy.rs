//! Static access policy.
//!
//! [`PermissionTable`] is the role→allowed-actions-per-resource mapping
//! plus the set of ownership-guarded operations. It is immutable after
//! construction and injected into the gate, never read from ambient
//! module state. [`GuardPolicy`] carries the per-route verification
//! requirements the gate evaluates before the role checks.

use crate::types::{Action, ResourceType};
use peira_core::Role;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Per-route requirements evaluated by the gate ahead of the role check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardPolicy {
    /// Deny unverified email addresses with `unverified`.
    #[serde(default)]
    pub require_verified: bool,
    /// Deny sessions without a completed two-factor challenge with
    /// `2fa-required`.
    #[serde(default)]
    pub require_two_factor: bool,
    /// When set, roles outside this set are denied with
    /// `role-forbidden` before the permission table is consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_roles: Option<HashSet<Role>>,
}

impl GuardPolicy {
    /// A policy with no additional requirements.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a verified email address.
    #[must_use]
    pub const fn require_verified(mut self) -> Self {
        self.require_verified = true;
        self
    }

    /// Requires a completed two-factor challenge.
    #[must_use]
    pub const fn require_two_factor(mut self) -> Self {
        self.require_two_factor = true;
        self
    }

    /// Restricts the route to the given roles.
    #[must_use]
    pub fn allow_roles<I: IntoIterator<Item = Role>>(mut self, roles: I) -> Self {
        self.allowed_roles = Some(roles.into_iter().collect());
        self
    }
}

/// Immutable role→allowed-actions-per-resource mapping.
///
/// The default table encodes the platform's shipped roles:
///
/// | Role | Grants |
/// |---|---|
/// | Admin | every action on every resource, exempt from ownership |
/// | Editor | create/read/update everywhere, delete on test cases and runs; test-case and test-run mutation is ownership-guarded |
/// | Viewer | read everywhere |
#[derive(Debug, Clone)]
pub struct PermissionTable {
    grants: HashMap<Role, HashMap<ResourceType, HashSet<Action>>>,
    ownership_guarded: HashSet<(ResourceType, Action)>,
    ownership_exempt: HashSet<Role>,
}

const ALL_RESOURCES: [ResourceType; 5] = [
    ResourceType::Project,
    ResourceType::TestSuite,
    ResourceType::TestCase,
    ResourceType::TestRun,
    ResourceType::Report,
];

const ALL_ACTIONS: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

impl PermissionTable {
    /// Starts an empty table builder.
    #[must_use]
    pub fn builder() -> PermissionTableBuilder {
        PermissionTableBuilder::default()
    }

    /// Whether the role may perform the action on the resource type.
    #[must_use]
    pub fn permits(&self, role: Role, resource: ResourceType, action: Action) -> bool {
        self.grants
            .get(&role)
            .and_then(|by_resource| by_resource.get(&resource))
            .is_some_and(|actions| actions.contains(&action))
    }

    /// Whether (resource, action) is ownership-guarded for the role.
    #[must_use]
    pub fn ownership_guarded(&self, role: Role, resource: ResourceType, action: Action) -> bool {
        !self.ownership_exempt.contains(&role)
            && self.ownership_guarded.contains(&(resource, action))
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        let mut builder = Self::builder().allow_all(Role::Admin).exempt_from_ownership(Role::Admin);

        for resource in ALL_RESOURCES {
            builder = builder
                .allow(Role::Editor, resource, [Action::Create, Action::Read, Action::Update])
                .allow(Role::Viewer, resource, [Action::Read]);
        }

        builder
            .allow(Role::Editor, ResourceType::TestCase, [Action::Delete])
            .allow(Role::Editor, ResourceType::TestRun, [Action::Delete])
            .require_ownership(ResourceType::TestCase, [Action::Update, Action::Delete])
            .require_ownership(ResourceType::TestRun, [Action::Update, Action::Delete])
            .build()
    }
}

/// Builder for [`PermissionTable`].
#[derive(Debug, Default)]
pub struct PermissionTableBuilder {
    grants: HashMap<Role, HashMap<ResourceType, HashSet<Action>>>,
    ownership_guarded: HashSet<(ResourceType, Action)>,
    ownership_exempt: HashSet<Role>,
}

impl PermissionTableBuilder {
    /// Grants the role the given actions on the resource type.
    #[must_use]
    pub fn allow<I: IntoIterator<Item = Action>>(
        mut self,
        role: Role,
        resource: ResourceType,
        actions: I,
    ) -> Self {
        self.grants
            .entry(role)
            .or_default()
            .entry(resource)
            .or_default()
            .extend(actions);
        self
    }

    /// Grants the role every action on every resource type.
    #[must_use]
    pub fn allow_all(mut self, role: Role) -> Self {
        for resource in ALL_RESOURCES {
            self = self.allow(role, resource, ALL_ACTIONS);
        }
        self
    }

    /// Marks the actions on the resource type as ownership-guarded.
    #[must_use]
    pub fn require_ownership<I: IntoIterator<Item = Action>>(
        mut self,
        resource: ResourceType,
        actions: I,
    ) -> Self {
        for action in actions {
            self.ownership_guarded.insert((resource, action));
        }
        self
    }

    /// Exempts the role from ownership checks.
    #[must_use]
    pub fn exempt_from_ownership(mut self, role: Role) -> Self {
        self.ownership_exempt.insert(role);
        self
    }

    /// Builds the immutable table.
    #[must_use]
    pub fn build(self) -> PermissionTable {
        PermissionTable {
            grants: self.grants,
            ownership_guarded: self.ownership_guarded,
            ownership_exempt: self.ownership_exempt,
        }
    }
}
