//! # Peira Middleware
//!
//! The ordered request-processing chain for the Peira pipeline.
//!
//! Every request flows through a caller-declared sequence of steps, then
//! the handler, with exactly one terminal outcome:
//!
//! ```text
//! Request → RequestId → RequestLog → Session → RateLimit → Validation → Access → Handler
//!                                                                                  ↓
//! Response ←──────────────────── error normalization on any failure ──────────────┘
//! ```
//!
//! Each [`Step`] inspects the request and the mutable [`StepContext`] and
//! returns a tagged [`StepOutcome`]: continue to the next step, respond
//! directly (short-circuit), or fail. The [`Chain`] runner interprets the
//! outcomes iteratively - no continuation nesting - and converts every
//! failure into the stable error envelope at a single point.
//!
//! Steps execute strictly in the declared order: request-id tagging must
//! precede logging, session resolution must precede the access gate.
//! A short-circuiting step prevents all later steps from executing, and
//! no step ever executes twice.
//!
//! Route policy is declarative: a [`RouteConfig`] states what a route
//! requires (authentication, verification, two-factor, rate limits, a
//! resource guard, required body fields) and the built-in steps read it
//! at request time.

#![doc(html_root_url = "https://docs.rs/peira-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod config;
pub mod context;
pub mod stages;
pub mod step;
pub mod types;

pub use chain::{Chain, ChainBuilder};
pub use config::{RateLimitPolicy, RouteConfig, RouteGuard};
pub use context::StepContext;
pub use step::{BoxFuture, FnStep, Step, StepOutcome};
pub use types::{Request, RequestBody, Response, ResponseExt};
