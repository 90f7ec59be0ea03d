//! Access gate step.
//!
//! Consults the [`AccessGate`] when the route declares a
//! [`RouteGuard`](crate::config::RouteGuard). The decision is stored in
//! the context for auditing whichever way it goes; a deny aborts the
//! chain with the decision's reason.
//!
//! The target resource id is taken from the trailing path segment under
//! the REST collection/item convention: `/test-cases/tc-1` targets item
//! `tc-1`, `/test-cases` and `/projects/p-1/test-cases` target the
//! collection. Routes that deviate from the convention can pass an
//! explicit extractor.

use crate::config::RouteConfig;
use crate::context::StepContext;
use crate::step::{BoxFuture, Step, StepOutcome};
use crate::types::Request;
use peira_access::{AccessGate, ResourceRef};
use std::sync::Arc;

/// How the step derives the target resource id from a request.
type IdExtractor = Arc<dyn Fn(&StepContext) -> Option<String> + Send + Sync>;

/// Step that enforces the route's resource guard through the gate.
#[derive(Clone)]
pub struct AccessStep {
    gate: AccessGate,
    config: Arc<RouteConfig>,
    id_extractor: IdExtractor,
}

impl std::fmt::Debug for AccessStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessStep")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AccessStep {
    /// Creates the step with the default path-based id extractor.
    #[must_use]
    pub fn new(gate: AccessGate, config: Arc<RouteConfig>) -> Self {
        Self {
            gate,
            config,
            id_extractor: Arc::new(|ctx| id_from_path(ctx.path())),
        }
    }

    /// Creates the step with an explicit resource-id extractor.
    #[must_use]
    pub fn with_id_extractor<F>(gate: AccessGate, config: Arc<RouteConfig>, extractor: F) -> Self
    where
        F: Fn(&StepContext) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            gate,
            config,
            id_extractor: Arc::new(extractor),
        }
    }
}

/// Resource id under the collection/item path convention: paths with an
/// even number of segments end in an item id.
fn id_from_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() % 2 == 0 {
        segments.last().map(|s| (*s).to_string())
    } else {
        None
    }
}

impl Step for AccessStep {
    fn name(&self) -> &'static str {
        "access"
    }

    fn apply<'a>(
        &'a self,
        ctx: &'a mut StepContext,
        _request: &'a Request,
    ) -> BoxFuture<'a, StepOutcome> {
        Box::pin(async move {
            let Some(guard) = self.config.guard else {
                return StepOutcome::Continue;
            };

            let resource = match (self.id_extractor)(ctx) {
                Some(id) => ResourceRef::item(guard.resource, id),
                None => ResourceRef::collection(guard.resource),
            };

            let decision = match self
                .gate
                .check(ctx.caller(), &self.config.policy, guard.action, &resource)
                .await
            {
                Ok(decision) => decision,
                Err(error) => return StepOutcome::Fail(error),
            };

            ctx.set_extension(decision.clone());

            match decision.into_error() {
                None => StepOutcome::Continue,
                Some(error) => StepOutcome::Fail(error),
            }
        })
    }
}
