//! Request validation step.
//!
//! Rejects malformed request bodies before the handler runs. The
//! transport buffers the body and stores it in request extensions as
//! [`RequestBody`](crate::types::RequestBody); steps never consume the
//! request itself.
//!
//! Checks, per the route's declared required fields:
//!
//! - a body must be present when fields are required
//! - the body must be valid JSON, and a JSON object
//! - every required top-level field must be present and non-null
//!
//! Routes that declare no required fields only pay a well-formedness
//! check when a body is present.

use crate::config::RouteConfig;
use crate::context::StepContext;
use crate::step::{BoxFuture, Step, StepOutcome};
use crate::types::{Request, RequestBody};
use peira_core::PeiraError;
use serde_json::Value;
use std::sync::Arc;

/// Step that validates the request body against the route's policy.
#[derive(Debug, Clone)]
pub struct ValidationStep {
    config: Arc<RouteConfig>,
}

impl ValidationStep {
    /// Creates the step over the given route policy.
    #[must_use]
    pub fn new(config: Arc<RouteConfig>) -> Self {
        Self { config }
    }

    fn validate(&self, body: &[u8]) -> Result<(), PeiraError> {
        let required = &self.config.required_fields;

        if body.is_empty() {
            if required.is_empty() {
                return Ok(());
            }
            return Err(PeiraError::validation("request body is required"));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|_| PeiraError::validation("request body is not valid JSON"))?;

        if required.is_empty() {
            return Ok(());
        }

        let object = value
            .as_object()
            .ok_or_else(|| PeiraError::validation("request body must be a JSON object"))?;

        for field in required {
            if object.get(field).map_or(true, Value::is_null) {
                return Err(PeiraError::validation(format!(
                    "missing required field '{field}'"
                )));
            }
        }

        Ok(())
    }
}

impl Step for ValidationStep {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn apply<'a>(
        &'a self,
        _ctx: &'a mut StepContext,
        request: &'a Request,
    ) -> BoxFuture<'a, StepOutcome> {
        Box::pin(async move {
            let body = request
                .extensions()
                .get::<RequestBody>()
                .map_or(&[][..], |body| body.0.as_ref());

            match self.validate(body) {
                Ok(()) => StepOutcome::Continue,
                Err(error) => StepOutcome::Fail(error),
            }
        })
    }
}
