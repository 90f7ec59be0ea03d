//! Declarative per-route policy.
//!
//! A [`RouteConfig`] is authored statically per route - in code or in a
//! config file - and read by the built-in steps at request time. It
//! never changes while a request is in flight.

use peira_access::{Action, GuardPolicy, ResourceType};
use peira_core::Role;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate-limit parameters for a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Requests allowed per window.
    pub points: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Optional block once the limit is exceeded, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_secs: Option<u64>,
}

impl RateLimitPolicy {
    /// Allows `points` requests per `window_secs` seconds.
    #[must_use]
    pub const fn new(points: u32, window_secs: u64) -> Self {
        Self {
            points,
            window_secs,
            block_secs: None,
        }
    }

    /// Blocks offenders for the given number of seconds once the limit
    /// is exceeded.
    #[must_use]
    pub const fn with_block(mut self, block_secs: u64) -> Self {
        self.block_secs = Some(block_secs);
        self
    }

    /// The window as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// The block as a [`Duration`], when configured.
    #[must_use]
    pub fn block(&self) -> Option<Duration> {
        self.block_secs.map(Duration::from_secs)
    }
}

/// The resource operation a route performs, checked by the access step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteGuard {
    /// The action the route performs.
    pub action: Action,
    /// The resource type the route operates on.
    pub resource: ResourceType,
}

/// Declarative policy for one route.
///
/// Built through the consuming builder methods; `require_two_factor`
/// implies `require_auth` (two-factor cannot be required without
/// authentication), and the builder keeps that invariant.
///
/// # Example
///
/// ```
/// use peira_access::{Action, ResourceType};
/// use peira_core::Role;
/// use peira_middleware::{RateLimitPolicy, RouteConfig};
///
/// let config = RouteConfig::new()
///     .require_verified()
///     .require_two_factor()
///     .allow_roles([Role::Admin, Role::Editor])
///     .guard(Action::Update, ResourceType::TestCase)
///     .rate_limit(RateLimitPolicy::new(100, 60))
///     .require_fields(["title"]);
///
/// assert!(config.require_auth);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Whether an authenticated session is required.
    #[serde(default)]
    pub require_auth: bool,
    /// Verification requirements evaluated by the gate.
    #[serde(flatten)]
    pub policy: GuardPolicy,
    /// The resource operation this route performs, when gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<RouteGuard>,
    /// Rate-limit parameters, when the route is limited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitPolicy>,
    /// Top-level body fields the validation step requires.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
}

impl RouteConfig {
    /// A route with no requirements.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires an authenticated session.
    #[must_use]
    pub const fn require_auth(mut self) -> Self {
        self.require_auth = true;
        self
    }

    /// Requires a verified email address.
    #[must_use]
    pub const fn require_verified(mut self) -> Self {
        self.policy.require_verified = true;
        self
    }

    /// Requires a completed two-factor challenge.
    ///
    /// Also requires authentication: a route cannot demand two-factor
    /// from an anonymous caller.
    #[must_use]
    pub const fn require_two_factor(mut self) -> Self {
        self.policy.require_two_factor = true;
        self.require_auth = true;
        self
    }

    /// Restricts the route to the given roles.
    #[must_use]
    pub fn allow_roles<I: IntoIterator<Item = Role>>(mut self, roles: I) -> Self {
        self.policy.allowed_roles = Some(roles.into_iter().collect());
        self
    }

    /// Declares the resource operation this route performs.
    #[must_use]
    pub const fn guard(mut self, action: Action, resource: ResourceType) -> Self {
        self.guard = Some(RouteGuard { action, resource });
        self
    }

    /// Applies rate-limit parameters to the route.
    #[must_use]
    pub const fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = Some(policy);
        self
    }

    /// Requires the given top-level fields in the request body.
    #[must_use]
    pub fn require_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the route demands an authenticated session, counting the
    /// two-factor implication.
    #[must_use]
    pub const fn authentication_required(&self) -> bool {
        self.require_auth || self.policy.require_two_factor
    }
}
