//! The step trait and its tagged outcome.
//!
//! A step inspects the request and context and returns exactly one
//! [`StepOutcome`]. Short-circuiting is explicit - a step responds or
//! fails instead of silently not calling a continuation - which keeps
//! the runner iterative and the control flow testable.

use crate::context::StepContext;
use crate::types::{Request, Response};
use peira_core::PeiraError;
use std::future::Future;
use std::pin::Pin;

/// A boxed future returned by steps and collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The outcome of applying one step to a request.
#[derive(Debug)]
pub enum StepOutcome {
    /// Proceed to the next step (or the handler).
    Continue,
    /// Terminate the chain with this response.
    Respond(Response),
    /// Abort the chain; the failure is normalized into the error
    /// envelope by the runner.
    Fail(PeiraError),
}

/// One unit of request processing in the declared, ordered chain.
///
/// # Invariants
///
/// - A step returns exactly one outcome per request.
/// - A step must not assume any other step ran unless it is declared
///   earlier in the chain.
///
/// # Example
///
/// ```
/// use peira_middleware::{BoxFuture, Request, Step, StepContext, StepOutcome};
///
/// struct MaintenanceMode;
///
/// impl Step for MaintenanceMode {
///     fn name(&self) -> &'static str {
///         "maintenance"
///     }
///
///     fn apply<'a>(
///         &'a self,
///         _ctx: &'a mut StepContext,
///         _request: &'a Request,
///     ) -> BoxFuture<'a, StepOutcome> {
///         Box::pin(async {
///             StepOutcome::Fail(peira_core::PeiraError::unexpected("maintenance"))
///         })
///     }
/// }
/// ```
pub trait Step: Send + Sync + 'static {
    /// Returns the unique name of this step, used for logging and
    /// debugging.
    fn name(&self) -> &'static str;

    /// Applies this step to the request.
    fn apply<'a>(
        &'a self,
        ctx: &'a mut StepContext,
        request: &'a Request,
    ) -> BoxFuture<'a, StepOutcome>;
}

/// A step built from an async function, for small one-off steps and
/// tests.
///
/// # Example
///
/// ```
/// use peira_middleware::{FnStep, StepOutcome};
///
/// let step = FnStep::new("noop", |_ctx, _req| {
///     Box::pin(async { StepOutcome::Continue })
/// });
/// ```
pub struct FnStep<F> {
    name: &'static str,
    func: F,
}

impl<F> FnStep<F>
where
    F: for<'a> Fn(&'a mut StepContext, &'a Request) -> BoxFuture<'a, StepOutcome>
        + Send
        + Sync
        + 'static,
{
    /// Creates a new function-based step.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Step for FnStep<F>
where
    F: for<'a> Fn(&'a mut StepContext, &'a Request) -> BoxFuture<'a, StepOutcome>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply<'a>(
        &'a self,
        ctx: &'a mut StepContext,
        request: &'a Request,
    ) -> BoxFuture<'a, StepOutcome> {
        (self.func)(ctx, request)
    }
}
