//! Step context.
//!
//! The [`StepContext`] carries per-request ambient data through the
//! chain: the request id, the resolved caller, and the transport facts
//! (path, peer IP, user agent) captured when the chain starts. Steps
//! enrich it - the request-id step assigns the id, the session step
//! stores the caller - and later steps and the handler read it.

use crate::types::Request;
use peira_core::{Caller, RequestId};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

/// Header inspected for the originating client IP.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Fallback header for the originating client IP.
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Context that flows through the step chain.
///
/// # Example
///
/// ```
/// use peira_core::{Caller, Role, Session};
/// use peira_middleware::StepContext;
///
/// let mut ctx = StepContext::new("/projects");
/// assert!(ctx.caller().is_anonymous());
///
/// ctx.set_caller(Caller::Session(Session::new("u-1", Role::Editor)));
/// assert_eq!(ctx.caller().log_id(), "user:u-1");
/// ```
#[derive(Debug)]
pub struct StepContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// The resolved caller; anonymous until the session step runs.
    caller: Caller,

    /// The request path.
    path: String,

    /// The originating client IP, as reported by the edge.
    peer_ip: Option<String>,

    /// The caller's user agent.
    user_agent: Option<String>,

    /// When the request started processing.
    started_at: Instant,

    /// Type-erased extension data stored by steps for later steps,
    /// the handler, or auditing.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl StepContext {
    /// Creates a context for the given path with a fresh request ID.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            caller: Caller::Anonymous,
            path: path.into(),
            peer_ip: None,
            user_agent: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Creates a context from an inbound request, capturing path, peer
    /// IP (`x-forwarded-for` first hop, then `x-real-ip`), and user
    /// agent.
    #[must_use]
    pub fn for_request(request: &Request) -> Self {
        let mut ctx = Self::new(request.uri().path());

        ctx.peer_ip = request
            .headers()
            .get(FORWARDED_FOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|ip| ip.trim().to_string())
            .or_else(|| {
                request
                    .headers()
                    .get(REAL_IP_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(ToString::to_string)
            });

        ctx.user_agent = request
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        ctx
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Sets the request ID.
    ///
    /// This should only be called by the request-id step.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the resolved caller.
    #[must_use]
    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// Sets the resolved caller.
    ///
    /// This should only be called by the session step.
    pub fn set_caller(&mut self, caller: Caller) {
        self.caller = caller;
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the originating client IP, if the edge reported one.
    #[must_use]
    pub fn peer_ip(&self) -> Option<&str> {
        self.peer_ip.as_deref()
    }

    /// Returns the caller's user agent, if present.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    ///
    /// Extensions let steps record data - an access decision, a rate
    /// decision - that later steps, the handler, or audit logging can
    /// retrieve.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}
