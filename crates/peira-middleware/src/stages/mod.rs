//! Built-in steps.
//!
//! The conventional order for a protected route:
//!
//! 1. [`request_id`] - tag the request before anything logs
//! 2. [`logging`] - structured request record
//! 3. [`session`] - resolve the credential into a caller
//! 4. [`rate_limit`] - consult the rate-limit collaborator
//! 5. [`validation`] - reject malformed bodies
//! 6. [`access`] - the RBAC gate
//!
//! The chain runner executes whatever order the caller declares; this
//! ordering is convention, not enforcement.

pub mod access;
pub mod logging;
pub mod rate_limit;
pub mod request_id;
pub mod session;
pub mod validation;

pub use access::AccessStep;
pub use logging::RequestLogStep;
pub use rate_limit::{RateDecision, RateLimitStep, RateLimiter, SlidingWindowLimiter};
pub use request_id::RequestIdStep;
pub use session::SessionStep;
pub use validation::ValidationStep;
