//! The iterative chain runner.
//!
//! [`Chain::run`] walks the declared steps strictly in order and
//! guarantees exactly one terminal outcome per request: a response from
//! a short-circuiting step, a response from the handler, or a failure
//! converted to the error envelope. Failures are normalized in one
//! place, whichever stage raised them.

use crate::context::StepContext;
use crate::stages::request_id::REQUEST_ID_HEADER;
use crate::step::{BoxFuture, Step, StepOutcome};
use crate::types::{Request, Response, ResponseExt};
use peira_core::PeiraResult;
use std::sync::Arc;

/// A type-erased step stored in the chain.
pub type BoxedStep = Arc<dyn Step>;

/// The ordered step chain for one route.
///
/// The step order is declared at construction and never changes at
/// request time; steps may have ordering dependencies (request-id
/// tagging precedes logging, session resolution precedes the access
/// gate).
///
/// # Example
///
/// ```
/// use peira_middleware::{Chain, FnStep, Response, ResponseExt, StepContext, StepOutcome};
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let chain = Chain::builder()
///     .add_step(FnStep::new("noop", |_ctx, _req| {
///         Box::pin(async { StepOutcome::Continue })
///     }))
///     .build();
///
/// let request = http::Request::builder()
///     .uri("/health")
///     .body(http_body_util::Full::new(bytes::Bytes::new()))
///     .unwrap();
/// let ctx = StepContext::for_request(&request);
///
/// let response = chain
///     .run(ctx, request, |_ctx, _req| {
///         Box::pin(async {
///             Ok(Response::json(StatusCode::OK, &serde_json::json!({"ok": true})))
///         })
///     })
///     .await;
/// assert_eq!(response.status(), StatusCode::OK);
/// # });
/// ```
pub struct Chain {
    steps: Vec<BoxedStep>,
}

impl Chain {
    /// Creates a new chain builder.
    #[must_use]
    pub fn builder() -> ChainBuilder {
        ChainBuilder::new()
    }

    /// Processes a request through the chain and the handler.
    ///
    /// Steps run strictly in declared order. `Continue` advances,
    /// `Respond` short-circuits with that response, and `Fail` aborts
    /// into error normalization. When every step continues, the handler
    /// runs; a handler error is normalized identically. Every outgoing
    /// response carries the `x-request-id` header.
    pub async fn run<H>(&self, mut ctx: StepContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut StepContext, Request) -> BoxFuture<'static, PeiraResult<Response>> + Send,
    {
        for step in &self.steps {
            match step.apply(&mut ctx, &request).await {
                StepOutcome::Continue => {}
                StepOutcome::Respond(response) => {
                    tracing::debug!(step = step.name(), "chain short-circuited");
                    return Self::finalize(&ctx, response);
                }
                StepOutcome::Fail(error) => {
                    tracing::debug!(step = step.name(), error = %error, "chain aborted");
                    return Self::finalize(&ctx, Response::from_error(&error));
                }
            }
        }

        let response = match handler(&mut ctx, request).await {
            Ok(response) => response,
            Err(error) => Response::from_error(&error),
        };

        Self::finalize(&ctx, response)
    }

    /// Stamps the request ID on the outgoing response.
    fn finalize(ctx: &StepContext, mut response: Response) -> Response {
        response.headers_mut().insert(
            REQUEST_ID_HEADER,
            ctx.request_id()
                .to_string()
                .parse()
                .expect("valid header value"),
        );
        response
    }

    /// Returns the names of all steps in order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

/// Builder for constructing a [`Chain`].
#[derive(Default)]
pub struct ChainBuilder {
    steps: Vec<BoxedStep>,
}

impl ChainBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a step; steps run in the order they are added.
    #[must_use]
    pub fn add_step<S: Step>(mut self, step: S) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Builds the chain with its declared order fixed.
    #[must_use]
    pub fn build(self) -> Chain {
        Chain { steps: self.steps }
    }
}
