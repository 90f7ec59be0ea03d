//! Request logging step.
//!
//! Emits one structured record per request with the correlation fields:
//! request id, method, path, caller, peer IP, user agent. Logging is
//! fire-and-forget; this step never fails and never short-circuits.
//!
//! Declared after the request-id step so the record carries the final
//! ID, and conventionally after the session step when the caller should
//! appear resolved. Declaring it earlier simply logs `anonymous`.

use crate::context::StepContext;
use crate::step::{BoxFuture, Step, StepOutcome};
use crate::types::Request;

/// Step that records one structured log line per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogStep;

impl RequestLogStep {
    /// Creates the logging step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for RequestLogStep {
    fn name(&self) -> &'static str {
        "request_log"
    }

    fn apply<'a>(
        &'a self,
        ctx: &'a mut StepContext,
        request: &'a Request,
    ) -> BoxFuture<'a, StepOutcome> {
        Box::pin(async move {
            tracing::info!(
                request_id = %ctx.request_id(),
                method = %request.method(),
                path = ctx.path(),
                caller = %ctx.caller().log_id(),
                peer_ip = ctx.peer_ip().unwrap_or("-"),
                user_agent = ctx.user_agent().unwrap_or("-"),
                "request received"
            );
            StepOutcome::Continue
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_always_continues() {
        let step = RequestLogStep::new();
        let mut ctx = StepContext::new("/projects");
        let request: Request = http::Request::builder()
            .uri("/projects")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let outcome = step.apply(&mut ctx, &request).await;
        assert!(matches!(outcome, StepOutcome::Continue));
    }

    #[test]
    fn test_step_name() {
        assert_eq!(RequestLogStep::new().name(), "request_log");
    }
}
