//! Request ID step.
//!
//! Tags each request with a unique identifier used for log correlation
//! and support references. Runs first so every later step and every log
//! line sees the final ID.
//!
//! ## Sources
//!
//! 1. `x-request-id` header, when the step is configured to trust it
//!    (internal traffic behind a trusted edge)
//! 2. A generated UUID v7 otherwise
//!
//! The chain runner echoes the ID on the response, letting clients
//! correlate their requests with server logs.

use crate::context::StepContext;
use crate::step::{BoxFuture, Step, StepOutcome};
use crate::types::Request;
use peira_core::RequestId;
use uuid::Uuid;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Step that generates or propagates request IDs.
#[derive(Debug, Clone, Default)]
pub struct RequestIdStep {
    /// Whether to trust incoming `x-request-id` headers.
    ///
    /// Should stay `false` for external traffic.
    trust_incoming: bool,
}

impl RequestIdStep {
    /// Creates a step that always generates a fresh ID.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a step that trusts incoming `x-request-id` headers.
    ///
    /// Use behind a trusted edge that has already assigned IDs.
    #[must_use]
    pub const fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    /// Extracts a request ID from headers if present and valid.
    fn extract_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(RequestId::from_uuid)
    }
}

impl Step for RequestIdStep {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn apply<'a>(
        &'a self,
        ctx: &'a mut StepContext,
        request: &'a Request,
    ) -> BoxFuture<'a, StepOutcome> {
        Box::pin(async move {
            let request_id = self
                .extract_request_id(request)
                .unwrap_or_else(RequestId::new);
            ctx.set_request_id(request_id);
            StepOutcome::Continue
        })
    }
}
