//! # Peira
//!
//! **The authenticated request pipeline for the Peira test management
//! platform.**
//!
//! Peira is the core that every request to the platform flows through:
//!
//! - **Session resolution** - a credential becomes a fully-populated
//!   session or the anonymous caller; nothing in between
//! - **An ordered step chain** - request-id tagging, logging, session,
//!   rate limiting, validation, and the access gate, with explicit
//!   short-circuiting and exactly one terminal outcome per request
//! - **An RBAC gate** - fixed-order fail-fast checks over an immutable
//!   permission table, with ownership constraints for mutations
//! - **One error-normalization point** - every failure becomes the same
//!   stable envelope, and internal details never leak
//!
//! ## Architecture
//!
//! ```text
//! Request → RequestId → RequestLog → Session → RateLimit → Validation → Access → Handler
//!                                                                                  ↓
//! Response ←──────────────────── error normalization on any failure ──────────────┘
//! ```
//!
//! The HTTP transport, session storage, and resource storage are
//! collaborators behind traits; this crate re-exports the building
//! blocks.

#![doc(html_root_url = "https://docs.rs/peira/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use peira_core as core;

// Re-export session resolution
pub use peira_session as session;

// Re-export access control
pub use peira_access as access;

// Re-export the step chain
pub use peira_middleware as middleware;

// Re-export logging bootstrap
pub use peira_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use peira::prelude::*;
///
/// let chain = Chain::builder().build();
/// assert_eq!(chain.step_count(), 0);
/// ```
pub mod prelude {
    pub use peira_access::{
        AccessDecision, AccessGate, Action, DenialReason, GuardPolicy, OwnershipLookup,
        PermissionTable, ResourceRef, ResourceType,
    };
    pub use peira_core::{Caller, ErrorKind, PeiraError, PeiraResult, RequestId, Role, Session};
    pub use peira_middleware::{
        Chain, RateLimitPolicy, Request, Response, ResponseExt, RouteConfig, Step, StepContext,
        StepOutcome,
    };
    pub use peira_session::{CredentialValidator, SessionResolver};
}
