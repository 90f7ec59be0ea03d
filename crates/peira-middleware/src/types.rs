//! Common types used throughout the step chain.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use peira_core::PeiraError;

/// The HTTP request type used in the step chain.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the step chain.
pub type Response = http::Response<Full<Bytes>>;

/// The buffered request body, stored in request extensions by the
/// transport layer before the chain runs.
///
/// Steps never consume the request, so body bytes are carried here
/// rather than in the `http` body slot.
#[derive(Debug, Clone)]
pub struct RequestBody(pub Bytes);

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a JSON response with the given status and body.
    fn json(status: StatusCode, body: &serde_json::Value) -> Response;

    /// Converts a pipeline failure into its client-visible response.
    ///
    /// Normalization happens here: the failure becomes the stable
    /// `{"error": {"kind", "message", "code"?}, "status"}` envelope, and
    /// rate limits additionally carry a `Retry-After` header.
    fn from_error(error: &PeiraError) -> Response;
}

impl ResponseExt for Response {
    fn json(status: StatusCode, body: &serde_json::Value) -> Response {
        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .expect("failed to build JSON response")
    }

    fn from_error(error: &PeiraError) -> Response {
        let normalized = error.normalize();
        let envelope =
            serde_json::to_value(normalized.to_envelope()).expect("envelope serializes to JSON");

        let mut response = Response::json(
            StatusCode::from_u16(normalized.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            &envelope,
        );

        if let Some(retry_after_ms) = normalized.retry_after_ms {
            let retry_after_secs = retry_after_ms.div_ceil(1000).max(1);
            response.headers_mut().insert(
                http::header::RETRY_AFTER,
                retry_after_secs.into(),
            );
        }

        response
    }
}
