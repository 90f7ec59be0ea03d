//! # Peira Access
//!
//! Role-based access control for the Peira pipeline.
//!
//! The [`AccessGate`] decides ALLOW or DENY for a (caller, action,
//! resource) triple. Checks run in a fixed fail-fast order - caller
//! authenticated, email verified, two-factor complete, role permitted,
//! ownership satisfied - and the first failing check names the denial
//! reason. The gate is a pure decision function: the only I/O is the
//! injected [`OwnershipLookup`] collaborator, and identical inputs
//! always produce identical decisions.
//!
//! Policy is data, not code: the static [`PermissionTable`] maps roles
//! to allowed actions per resource and declares which (resource,
//! action) pairs are ownership-guarded, and the per-route
//! [`GuardPolicy`] carries the verification requirements.

#![doc(html_root_url = "https://docs.rs/peira-access/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod gate;
mod policy;
mod types;

pub use gate::{AccessGate, BoxFuture, OwnershipLookup, StaticOwnership};
pub use policy::{GuardPolicy, PermissionTable, PermissionTableBuilder};
pub use types::{AccessDecision, Action, DenialReason, Ownership, ResourceRef, ResourceType};
