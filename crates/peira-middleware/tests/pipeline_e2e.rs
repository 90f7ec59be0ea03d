//! End-to-end chain integration tests.
//!
//! These tests run the full step chain - request id, logging, session,
//! rate limit, validation, access - against realistic route policies
//! and verify the terminal outcomes, including every denial scenario
//! the access gate distinguishes.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use peira_access::{
    AccessGate, Action, Ownership, PermissionTable, ResourceType, StaticOwnership,
};
use peira_core::{PeiraError, PeiraResult, Role, Session};
use peira_middleware::stages::{
    AccessStep, RateLimitStep, RequestIdStep, RequestLogStep, SessionStep, SlidingWindowLimiter,
    ValidationStep,
};
use peira_middleware::{
    BoxFuture, Chain, RateLimitPolicy, Request, RequestBody, Response, ResponseExt, RouteConfig,
    StepContext,
};
use peira_session::{SessionResolver, StaticCredentialValidator};
use std::sync::Arc;

fn resolver() -> SessionResolver {
    let validator = StaticCredentialValidator::new()
        .with_session(
            "tok-admin",
            Session::new("u-admin", Role::Admin)
                .with_verified_email("admin@example.com")
                .with_two_factor_complete(),
        )
        .with_session(
            "tok-editor",
            Session::new("u-editor", Role::Editor).with_verified_email("editor@example.com"),
        )
        .with_session(
            "tok-other",
            Session::new("u-other", Role::Editor).with_verified_email("other@example.com"),
        )
        .with_session(
            "tok-viewer",
            Session::new("u-viewer", Role::Viewer).with_verified_email("viewer@example.com"),
        );
    SessionResolver::new(Arc::new(validator))
}

fn gate() -> AccessGate {
    let ownership = StaticOwnership::new().with_owner(
        ResourceType::TestCase,
        "tc-1",
        Ownership {
            owner_id: "u-editor".to_string(),
            team_member_ids: vec!["u-team".to_string()],
        },
    );
    AccessGate::new(Arc::new(PermissionTable::default()), Arc::new(ownership))
}

/// Builds the conventional six-step chain for a route.
fn build_chain(config: &Arc<RouteConfig>) -> Chain {
    let limit = config
        .rate_limit
        .clone()
        .unwrap_or(RateLimitPolicy::new(1_000, 60));

    Chain::builder()
        .add_step(RequestIdStep::new())
        .add_step(RequestLogStep::new())
        .add_step(SessionStep::new(resolver(), config.clone()))
        .add_step(RateLimitStep::new(
            Arc::new(SlidingWindowLimiter::new(limit)),
            config.clone(),
        ))
        .add_step(ValidationStep::new(config.clone()))
        .add_step(AccessStep::new(gate(), config.clone()))
        .build()
}

fn make_request(method: &str, path: &str, token: Option<&str>, body: Option<&str>) -> Request {
    let mut builder = http::Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let mut request = builder.body(Full::new(Bytes::new())).unwrap();
    if let Some(body) = body {
        request
            .extensions_mut()
            .insert(RequestBody(Bytes::from(body.to_string())));
    }
    request
}

fn ok_handler(_ctx: &mut StepContext, _req: Request) -> BoxFuture<'static, PeiraResult<Response>> {
    Box::pin(async { Ok(Response::json(StatusCode::OK, &serde_json::json!({"ok": true}))) })
}

async fn run(chain: &Chain, request: Request) -> Response {
    let ctx = StepContext::for_request(&request);
    chain.run(ctx, request, ok_handler).await
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn error_code(body: &serde_json::Value) -> Option<&str> {
    body["error"]["code"].as_str()
}

#[tokio::test]
async fn test_admin_creates_project() {
    let config = Arc::new(
        RouteConfig::new()
            .require_verified()
            .require_two_factor()
            .guard(Action::Create, ResourceType::Project)
            .require_fields(["name"]),
    );
    let chain = build_chain(&config);

    let request = make_request(
        "POST",
        "/projects",
        Some("tok-admin"),
        Some(r#"{"name": "Checkout"}"#),
    );
    let response = run(&chain, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_read_project_denied_unauthenticated() {
    let config = Arc::new(RouteConfig::new().guard(Action::Read, ResourceType::Project));
    let chain = build_chain(&config);

    let response = run(&chain, make_request("GET", "/projects", None, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(error_code(&body), Some("unauthenticated"));
}

#[tokio::test]
async fn test_viewer_delete_test_case_role_forbidden() {
    let config = Arc::new(
        RouteConfig::new()
            .require_auth()
            .guard(Action::Delete, ResourceType::TestCase),
    );
    let chain = build_chain(&config);

    let request = make_request("DELETE", "/test-cases/tc-1", Some("tok-viewer"), None);
    let response = run(&chain, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(error_code(&body), Some("role-forbidden"));
}

#[tokio::test]
async fn test_editor_updates_own_test_case() {
    let config = Arc::new(
        RouteConfig::new()
            .require_auth()
            .guard(Action::Update, ResourceType::TestCase)
            .require_fields(["title"]),
    );
    let chain = build_chain(&config);

    let request = make_request(
        "PUT",
        "/test-cases/tc-1",
        Some("tok-editor"),
        Some(r#"{"title": "Login succeeds"}"#),
    );
    let response = run(&chain, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_foreign_editor_update_denied_not_owner() {
    let config = Arc::new(
        RouteConfig::new()
            .require_auth()
            .guard(Action::Update, ResourceType::TestCase)
            .require_fields(["title"]),
    );
    let chain = build_chain(&config);

    let request = make_request(
        "PUT",
        "/test-cases/tc-1",
        Some("tok-other"),
        Some(r#"{"title": "Hijacked"}"#),
    );
    let response = run(&chain, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(error_code(&body), Some("not-owner"));
}

#[tokio::test]
async fn test_missing_credential_on_protected_route_is_401() {
    let config = Arc::new(RouteConfig::new().require_auth());
    let chain = build_chain(&config);

    let response = run(&chain, make_request("GET", "/projects", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"]["kind"], "authentication");
}

#[tokio::test]
async fn test_invalid_credential_is_401_even_on_open_route() {
    let config = Arc::new(RouteConfig::new());
    let chain = build_chain(&config);

    let request = make_request("GET", "/projects", Some("tok-forged"), None);
    let response = run(&chain, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unverified_editor_denied_before_two_factor() {
    // tok-editor is verified but has no 2FA; a 2FA-requiring route denies
    // with the 2FA reason, not a role reason.
    let config = Arc::new(
        RouteConfig::new()
            .require_verified()
            .require_two_factor()
            .guard(Action::Create, ResourceType::Project),
    );
    let chain = build_chain(&config);

    let request = make_request("POST", "/projects", Some("tok-editor"), None);
    let response = run(&chain, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(error_code(&body), Some("2fa-required"));
}

#[tokio::test]
async fn test_missing_required_field_is_400() {
    let config = Arc::new(
        RouteConfig::new()
            .require_auth()
            .guard(Action::Create, ResourceType::TestCase)
            .require_fields(["title"]),
    );
    let chain = build_chain(&config);

    let request = make_request(
        "POST",
        "/test-cases",
        Some("tok-editor"),
        Some(r#"{"priority": 1}"#),
    );
    let response = run(&chain, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["kind"], "validation");
}

#[tokio::test]
async fn test_rate_limit_blocks_third_request() {
    let config = Arc::new(
        RouteConfig::new()
            .require_auth()
            .rate_limit(RateLimitPolicy::new(2, 60)),
    );
    let chain = build_chain(&config);

    for _ in 0..2 {
        let request = make_request("GET", "/projects", Some("tok-viewer"), None);
        assert_eq!(run(&chain, request).await.status(), StatusCode::OK);
    }

    let request = make_request("GET", "/projects", Some("tok-viewer"), None);
    let response = run(&chain, request).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(http::header::RETRY_AFTER));
}

#[tokio::test]
async fn test_every_response_carries_request_id() {
    let config = Arc::new(RouteConfig::new());
    let chain = build_chain(&config);

    let ok = run(&chain, make_request("GET", "/projects", None, None)).await;
    assert!(ok.headers().contains_key("x-request-id"));

    let denied_config = Arc::new(RouteConfig::new().require_auth());
    let denied_chain = build_chain(&denied_config);
    let denied = run(&denied_chain, make_request("GET", "/projects", None, None)).await;
    assert!(denied.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_handler_database_failure_stays_generic() {
    let config = Arc::new(RouteConfig::new());
    let chain = build_chain(&config);

    let request = make_request("GET", "/projects", None, None);
    let ctx = StepContext::for_request(&request);
    let response = chain
        .run(ctx, request, |_ctx, _req| {
            Box::pin(async {
                Err(PeiraError::database("connection refused to db-primary:5432"))
            })
        })
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["kind"], "database");
    assert_eq!(body["error"]["message"], "An internal error occurred");
}

#[tokio::test]
async fn test_short_circuit_skips_access_gate() {
    // The validation step fails before the gate runs; the response is a
    // validation error even though the caller would also be denied.
    let config = Arc::new(
        RouteConfig::new()
            .require_auth()
            .guard(Action::Delete, ResourceType::TestCase)
            .require_fields(["confirm"]),
    );
    let chain = build_chain(&config);

    let request = make_request("DELETE", "/test-cases/tc-1", Some("tok-viewer"), None);
    let response = run(&chain, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
