//! The access gate.
//!
//! Checks run in a fixed order and the first failure names the denial
//! reason: unauthenticated → unverified → 2fa-required →
//! role-forbidden → not-owner. Later checks are never evaluated once an
//! earlier one fails.

use crate::policy::{GuardPolicy, PermissionTable};
use crate::types::{AccessDecision, Action, DenialReason, Ownership, ResourceRef, ResourceType};
use peira_core::{Caller, PeiraError, PeiraResult};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Supplies the owning party of a resource instance.
///
/// Implementations typically query the platform's storage layer; a
/// failure there surfaces as [`PeiraError::Database`] and propagates
/// through the gate untouched.
pub trait OwnershipLookup: Send + Sync + 'static {
    /// Returns the owning party of the given resource instance.
    fn owner<'a>(
        &'a self,
        resource: ResourceType,
        id: &'a str,
    ) -> BoxFuture<'a, PeiraResult<Ownership>>;
}

/// The RBAC decision gate.
///
/// Holds the immutable [`PermissionTable`] and the ownership
/// collaborator; carries no mutable state, so identical inputs always
/// yield identical decisions.
///
/// # Example
///
/// ```
/// use peira_access::{
///     AccessGate, Action, GuardPolicy, PermissionTable, ResourceRef, ResourceType,
///     StaticOwnership,
/// };
/// use peira_core::{Caller, Role, Session};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let gate = AccessGate::new(
///     Arc::new(PermissionTable::default()),
///     Arc::new(StaticOwnership::new()),
/// );
///
/// let caller = Caller::Session(Session::new("u-1", Role::Viewer));
/// let decision = gate
///     .check(
///         &caller,
///         &GuardPolicy::new(),
///         Action::Read,
///         &ResourceRef::collection(ResourceType::Project),
///     )
///     .await
///     .unwrap();
/// assert!(decision.is_allowed());
/// # });
/// ```
#[derive(Clone)]
pub struct AccessGate {
    table: Arc<PermissionTable>,
    ownership: Arc<dyn OwnershipLookup>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl AccessGate {
    /// Creates a gate over the given table and ownership collaborator.
    #[must_use]
    pub fn new(table: Arc<PermissionTable>, ownership: Arc<dyn OwnershipLookup>) -> Self {
        Self { table, ownership }
    }

    /// Decides whether the caller may perform the action on the resource.
    ///
    /// The ownership check is skipped when the resource reference
    /// carries no id (creation-style operations have no owner yet).
    pub async fn check(
        &self,
        caller: &Caller,
        policy: &GuardPolicy,
        action: Action,
        resource: &ResourceRef,
    ) -> PeiraResult<AccessDecision> {
        let decision = self.evaluate(caller, policy, action, resource).await?;

        match decision.reason {
            None => tracing::debug!(
                caller = %caller.log_id(),
                action = %action,
                resource = %resource.resource,
                "access allowed"
            ),
            Some(reason) => tracing::info!(
                caller = %caller.log_id(),
                action = %action,
                resource = %resource.resource,
                reason = %reason,
                "access denied"
            ),
        }

        Ok(decision)
    }

    async fn evaluate(
        &self,
        caller: &Caller,
        policy: &GuardPolicy,
        action: Action,
        resource: &ResourceRef,
    ) -> PeiraResult<AccessDecision> {
        let deny = |reason| AccessDecision::deny(action, resource.resource, reason);

        let Some(session) = caller.session() else {
            return Ok(deny(DenialReason::Unauthenticated));
        };

        if policy.require_verified && !session.email_verified {
            return Ok(deny(DenialReason::Unverified));
        }

        if policy.require_two_factor && !session.two_factor_authenticated {
            return Ok(deny(DenialReason::TwoFactorRequired));
        }

        if let Some(allowed) = &policy.allowed_roles {
            if !allowed.contains(&session.role) {
                return Ok(deny(DenialReason::RoleForbidden));
            }
        }

        if !self.table.permits(session.role, resource.resource, action) {
            return Ok(deny(DenialReason::RoleForbidden));
        }

        if self.table.ownership_guarded(session.role, resource.resource, action) {
            if let Some(id) = &resource.id {
                let ownership = self.ownership.owner(resource.resource, id).await?;
                if !ownership.permits(&session.subject_id) {
                    return Ok(deny(DenialReason::NotOwner));
                }
            }
        }

        Ok(AccessDecision::allow(action, resource.resource))
    }
}

/// A fixed (resource, id)→ownership map for tests and local development.
///
/// Unknown resources fail with [`PeiraError::Database`], matching the
/// behavior of a storage-backed lookup that cannot find the row.
#[derive(Debug, Clone, Default)]
pub struct StaticOwnership {
    owners: HashMap<(ResourceType, String), Ownership>,
}

impl StaticOwnership {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the owning party of a resource instance.
    #[must_use]
    pub fn with_owner(
        mut self,
        resource: ResourceType,
        id: impl Into<String>,
        ownership: Ownership,
    ) -> Self {
        self.owners.insert((resource, id.into()), ownership);
        self
    }
}

impl OwnershipLookup for StaticOwnership {
    fn owner<'a>(
        &'a self,
        resource: ResourceType,
        id: &'a str,
    ) -> BoxFuture<'a, PeiraResult<Ownership>> {
        Box::pin(async move {
            self.owners
                .get(&(resource, id.to_string()))
                .cloned()
                .ok_or_else(|| {
                    PeiraError::database(format!("ownership row missing for {resource} '{id}'"))
                })
        })
    }
}
