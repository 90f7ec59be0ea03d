//! Rate limiting step.
//!
//! The step itself holds no counters; it consults a [`RateLimiter`]
//! collaborator that owns the cross-request state and returns a
//! [`RateDecision`]. The in-process [`SlidingWindowLimiter`] is the
//! default collaborator; deployments with shared state swap in their
//! own implementation behind the same trait.
//!
//! ## Keying
//!
//! Authenticated requests are limited per subject, anonymous requests
//! per peer IP. Requests with neither (no session step declared, edge
//! reported no IP) skip the limit rather than sharing one bucket.
//!
//! ## Window algorithm
//!
//! The in-memory limiter uses a sliding window: the previous window's
//! count is weighted by how much of it still overlaps the current
//! window, which smooths bursts at window boundaries.

use crate::config::{RateLimitPolicy, RouteConfig};
use crate::context::StepContext;
use crate::step::{BoxFuture, Step, StepOutcome};
use crate::types::Request;
use parking_lot::Mutex;
use peira_core::{PeiraError, PeiraResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a rate-limit consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request is allowed.
    pub allowed: bool,
    /// Milliseconds until requests are allowed again, when blocked.
    pub retry_after_ms: Option<u64>,
}

/// Owns rate-limit counters and decides per key.
///
/// The pipeline only consumes the decision; retries and backoff
/// bookkeeping belong to the implementation.
pub trait RateLimiter: Send + Sync + 'static {
    /// Consumes `points` for `key` and reports whether the request may
    /// proceed.
    fn consume<'a>(&'a self, key: &'a str, points: u32) -> BoxFuture<'a, PeiraResult<RateDecision>>;
}

/// Step that enforces the route's rate-limit policy.
pub struct RateLimitStep {
    limiter: Arc<dyn RateLimiter>,
    config: Arc<RouteConfig>,
}

impl std::fmt::Debug for RateLimitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitStep")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RateLimitStep {
    /// Creates the step over the given limiter collaborator and route
    /// policy.
    #[must_use]
    pub fn new(limiter: Arc<dyn RateLimiter>, config: Arc<RouteConfig>) -> Self {
        Self { limiter, config }
    }

    /// The rate-limit key: subject for authenticated callers, peer IP
    /// otherwise.
    fn extract_key(ctx: &StepContext) -> Option<String> {
        ctx.caller()
            .session()
            .map(|session| format!("user:{}", session.subject_id))
            .or_else(|| ctx.peer_ip().map(|ip| format!("ip:{ip}")))
    }
}

impl Step for RateLimitStep {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn apply<'a>(
        &'a self,
        ctx: &'a mut StepContext,
        _request: &'a Request,
    ) -> BoxFuture<'a, StepOutcome> {
        Box::pin(async move {
            if self.config.rate_limit.is_none() {
                return StepOutcome::Continue;
            }

            let Some(key) = Self::extract_key(ctx) else {
                return StepOutcome::Continue;
            };

            let decision = match self.limiter.consume(&key, 1).await {
                Ok(decision) => decision,
                Err(error) => return StepOutcome::Fail(error),
            };

            ctx.set_extension(decision.clone());

            if decision.allowed {
                StepOutcome::Continue
            } else {
                tracing::info!(
                    request_id = %ctx.request_id(),
                    key,
                    retry_after_ms = decision.retry_after_ms,
                    "rate limit exceeded"
                );
                StepOutcome::Fail(PeiraError::rate_limited(
                    "Too many requests. Please try again later.",
                    decision.retry_after_ms,
                ))
            }
        })
    }
}

/// In-process sliding-window rate limiter.
///
/// Tracks one window pair per key; the previous window's count is
/// weighted by its remaining overlap with the current window. When the
/// policy declares a block duration, offenders are blocked for that
/// long once the limit is exceeded.
pub struct SlidingWindowLimiter {
    policy: RateLimitPolicy,
    store: Mutex<HashMap<String, WindowData>>,
}

#[derive(Debug, Clone)]
struct WindowData {
    count: u64,
    window_start: Instant,
    prev_count: u64,
    blocked_until: Option<Instant>,
}

impl std::fmt::Debug for SlidingWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindowLimiter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SlidingWindowLimiter {
    /// Creates a limiter enforcing the given policy.
    #[must_use]
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            store: Mutex::new(HashMap::new()),
        }
    }

    fn check(&self, key: &str, points: u32) -> RateDecision {
        let mut store = self.store.lock();
        let now = Instant::now();
        let window = self.policy.window();
        let limit = u64::from(self.policy.points);

        let data = store.entry(key.to_string()).or_insert_with(|| WindowData {
            count: 0,
            window_start: now,
            prev_count: 0,
            blocked_until: None,
        });

        if let Some(blocked_until) = data.blocked_until {
            if now < blocked_until {
                return RateDecision {
                    allowed: false,
                    retry_after_ms: Some(duration_ms(blocked_until - now)),
                };
            }
            data.blocked_until = None;
        }

        // Advance windows.
        let elapsed = now.duration_since(data.window_start);
        if elapsed >= window {
            let windows_passed = elapsed.as_secs() / window.as_secs().max(1);
            data.prev_count = if windows_passed >= 2 { 0 } else { data.count };
            data.count = 0;
            data.window_start = now;
        }

        // Weight the previous window by its remaining overlap.
        let progress =
            now.duration_since(data.window_start).as_secs_f64() / window.as_secs_f64();
        let prev_weight = 1.0 - progress;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let weighted = data.count + (data.prev_count as f64 * prev_weight) as u64;

        let reset_in = window.saturating_sub(now.duration_since(data.window_start));

        if weighted + u64::from(points) > limit {
            let retry_after = match self.policy.block() {
                Some(block) => {
                    data.blocked_until = Some(now + block);
                    block
                }
                None => reset_in,
            };
            RateDecision {
                allowed: false,
                retry_after_ms: Some(duration_ms(retry_after)),
            }
        } else {
            data.count += u64::from(points);
            RateDecision {
                allowed: true,
                retry_after_ms: None,
            }
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl RateLimiter for SlidingWindowLimiter {
    fn consume<'a>(&'a self, key: &'a str, points: u32) -> BoxFuture<'a, PeiraResult<RateDecision>> {
        Box::pin(async move { Ok(self.check(key, points)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use peira_core::{Caller, ErrorKind, Role, Session};

    fn limiter(points: u32) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(RateLimitPolicy::new(points, 60))
    }

    fn make_request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_allows_under_limit() {
        let limiter = limiter(3);
        for _ in 0..3 {
            let decision = limiter.consume("k", 1).await.unwrap();
            assert!(decision.allowed);
        }
    }

    #[tokio::test]
    async fn test_blocks_over_limit_with_retry_after() {
        let limiter = limiter(2);
        limiter.consume("k", 1).await.unwrap();
        limiter.consume("k", 1).await.unwrap();

        let decision = limiter.consume("k", 1).await.unwrap();
        assert!(!decision.allowed);
        let retry = decision.retry_after_ms.expect("blocked decision carries retry-after");
        assert!(retry <= 60_000);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(1);
        limiter.consume("k1", 1).await.unwrap();
        assert!(!limiter.consume("k1", 1).await.unwrap().allowed);
        assert!(limiter.consume("k2", 1).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_block_duration_applies() {
        let limiter =
            SlidingWindowLimiter::new(RateLimitPolicy::new(1, 60).with_block(300));
        limiter.consume("k", 1).await.unwrap();

        let decision = limiter.consume("k", 1).await.unwrap();
        assert!(!decision.allowed);
        let retry = decision.retry_after_ms.unwrap();
        assert!(retry > 290_000 && retry <= 300_000);

        // Still blocked on the next consultation.
        assert!(!limiter.consume("k", 1).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_step_skips_unlimited_routes() {
        let step = RateLimitStep::new(
            Arc::new(limiter(0)),
            Arc::new(RouteConfig::new()),
        );
        let mut ctx = StepContext::new("/test");

        let outcome = step.apply(&mut ctx, &make_request()).await;
        assert!(matches!(outcome, StepOutcome::Continue));
    }

    #[tokio::test]
    async fn test_step_fails_when_limited() {
        let config =
            Arc::new(RouteConfig::new().rate_limit(RateLimitPolicy::new(1, 60)));
        let step = RateLimitStep::new(Arc::new(limiter(1)), config);

        let mut ctx = StepContext::new("/test");
        ctx.set_caller(Caller::Session(Session::new("u-1", Role::Editor)));

        let outcome = step.apply(&mut ctx, &make_request()).await;
        assert!(matches!(outcome, StepOutcome::Continue));

        match step.apply(&mut ctx, &make_request()).await {
            StepOutcome::Fail(error) => {
                assert_eq!(error.kind(), ErrorKind::RateLimited);
            }
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_step_keys_anonymous_by_ip() {
        let config =
            Arc::new(RouteConfig::new().rate_limit(RateLimitPolicy::new(1, 60)));
        let limiter = Arc::new(limiter(1));
        let step = RateLimitStep::new(limiter.clone(), config);

        let request: Request = http::Request::builder()
            .uri("/test")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let mut ctx = StepContext::for_request(&request);

        step.apply(&mut ctx, &request).await;
        assert!(!limiter.consume("ip:203.0.113.9", 1).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_step_skips_when_no_key() {
        let config =
            Arc::new(RouteConfig::new().rate_limit(RateLimitPolicy::new(1, 60)));
        let step = RateLimitStep::new(Arc::new(limiter(1)), config);

        // Anonymous caller and no reported IP.
        let mut ctx = StepContext::new("/test");
        for _ in 0..3 {
            let outcome = step.apply(&mut ctx, &make_request()).await;
            assert!(matches!(outcome, StepOutcome::Continue));
        }
    }

    #[test]
    fn test_step_name() {
        let step = RateLimitStep::new(Arc::new(limiter(1)), Arc::new(RouteConfig::new()));
        assert_eq!(step.name(), "rate_limit");
    }
}
