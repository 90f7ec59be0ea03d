//! Session step.
//!
//! Extracts the request's credential and resolves it into a caller via
//! the [`SessionResolver`]. Credential sources, in precedence order:
//!
//! 1. `Authorization: Bearer <token>`
//! 2. The `peira_session` cookie
//!
//! An absent credential leaves the caller anonymous; the step then
//! fails only when the route requires authentication. An invalid
//! credential always fails, regardless of route policy.

use crate::config::RouteConfig;
use crate::context::StepContext;
use crate::step::{BoxFuture, Step, StepOutcome};
use crate::types::Request;
use peira_core::PeiraError;
use peira_session::SessionResolver;
use std::sync::Arc;

/// The session cookie name.
pub const SESSION_COOKIE: &str = "peira_session";

/// Step that resolves the request's credential into a caller.
#[derive(Debug, Clone)]
pub struct SessionStep {
    resolver: SessionResolver,
    config: Arc<RouteConfig>,
}

impl SessionStep {
    /// Creates the step over the given resolver and route policy.
    #[must_use]
    pub fn new(resolver: SessionResolver, config: Arc<RouteConfig>) -> Self {
        Self { resolver, config }
    }

    /// Extracts the raw credential, bearer token first.
    fn extract_credential(request: &Request) -> Option<String> {
        let bearer = request
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(ToString::to_string);
        if bearer.is_some() {
            return bearer;
        }

        request
            .headers()
            .get(http::header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|cookies| {
                cookies.split(';').find_map(|cookie| {
                    cookie
                        .trim()
                        .strip_prefix(SESSION_COOKIE)
                        .and_then(|rest| rest.strip_prefix('='))
                        .map(ToString::to_string)
                })
            })
    }
}

impl Step for SessionStep {
    fn name(&self) -> &'static str {
        "session"
    }

    fn apply<'a>(
        &'a self,
        ctx: &'a mut StepContext,
        request: &'a Request,
    ) -> BoxFuture<'a, StepOutcome> {
        Box::pin(async move {
            let credential = Self::extract_credential(request);

            let caller = match self.resolver.resolve(credential.as_deref()).await {
                Ok(caller) => caller,
                Err(error) => return StepOutcome::Fail(error),
            };

            if self.config.authentication_required() && caller.is_anonymous() {
                return StepOutcome::Fail(PeiraError::authentication(
                    "authentication required",
                ));
            }

            ctx.set_caller(caller);
            StepOutcome::Continue
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use peira_core::{ErrorKind, Role, Session};
    use peira_session::StaticCredentialValidator;

    fn resolver() -> SessionResolver {
        let validator = StaticCredentialValidator::new()
            .with_session("tok-alice", Session::new("u-alice", Role::Editor));
        SessionResolver::new(Arc::new(validator))
    }

    fn step(config: RouteConfig) -> SessionStep {
        SessionStep::new(resolver(), Arc::new(config))
    }

    fn bare_request() -> Request {
        http::Request::builder()
            .uri("/projects")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn bearer_request(token: &str) -> Request {
        http::Request::builder()
            .uri("/projects")
            .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn cookie_request(cookies: &str) -> Request {
        http::Request::builder()
            .uri("/projects")
            .header(http::header::COOKIE, cookies)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_continues_on_open_route() {
        let step = step(RouteConfig::new());
        let mut ctx = StepContext::new("/projects");

        let outcome = step.apply(&mut ctx, &bare_request()).await;
        assert!(matches!(outcome, StepOutcome::Continue));
        assert!(ctx.caller().is_anonymous());
    }

    #[tokio::test]
    async fn test_anonymous_fails_on_protected_route() {
        let step = step(RouteConfig::new().require_auth());
        let mut ctx = StepContext::new("/projects");

        match step.apply(&mut ctx, &bare_request()).await {
            StepOutcome::Fail(error) => assert_eq!(error.kind(), ErrorKind::Authentication),
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_resolves_caller() {
        let step = step(RouteConfig::new().require_auth());
        let mut ctx = StepContext::new("/projects");

        let outcome = step.apply(&mut ctx, &bearer_request("tok-alice")).await;
        assert!(matches!(outcome, StepOutcome::Continue));
        assert_eq!(ctx.caller().log_id(), "user:u-alice");
    }

    #[tokio::test]
    async fn test_session_cookie_resolves_caller() {
        let step = step(RouteConfig::new());
        let mut ctx = StepContext::new("/projects");
        let request = cookie_request("theme=dark; peira_session=tok-alice; lang=en");

        let outcome = step.apply(&mut ctx, &request).await;
        assert!(matches!(outcome, StepOutcome::Continue));
        assert_eq!(ctx.caller().log_id(), "user:u-alice");
    }

    #[tokio::test]
    async fn test_bearer_takes_precedence_over_cookie() {
        let step = step(RouteConfig::new());
        let mut ctx = StepContext::new("/projects");
        let request = http::Request::builder()
            .uri("/projects")
            .header(http::header::AUTHORIZATION, "Bearer tok-alice")
            .header(http::header::COOKIE, "peira_session=tok-unknown")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let outcome = step.apply(&mut ctx, &request).await;
        assert!(matches!(outcome, StepOutcome::Continue));
    }

    #[tokio::test]
    async fn test_invalid_credential_fails_even_on_open_route() {
        let step = step(RouteConfig::new());
        let mut ctx = StepContext::new("/projects");

        match step.apply(&mut ctx, &bearer_request("tok-unknown")).await {
            StepOutcome::Fail(error) => assert_eq!(error.kind(), ErrorKind::Authentication),
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[test]
    fn test_step_name() {
        assert_eq!(step(RouteConfig::new()).name(), "session");
    }
}
