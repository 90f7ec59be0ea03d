//! Concrete credential validators.
//!
//! [`BearerTokenValidator`] decodes the platform's session-token claims
//! payload. The token's signature is verified at the platform edge
//! before the request reaches this pipeline; this validator enforces
//! payload structure and expiry. [`StaticCredentialValidator`] maps
//! fixed tokens to sessions for tests and local development.

use crate::resolver::{BoxFuture, CredentialValidator};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use peira_core::{PeiraError, PeiraResult, Role, Session};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Claims carried in a session token payload.
///
/// `exp` is unix seconds; a missing `exp` means the token does not
/// expire (used by service credentials minted at the edge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject identifier.
    pub sub: String,
    /// Role name (`admin`, `editor`, `viewer`).
    pub role: String,
    /// Email address, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the email address is verified.
    #[serde(default)]
    pub email_verified: bool,
    /// Whether the account has two-factor authentication enabled.
    #[serde(default)]
    pub two_factor_enabled: bool,
    /// Whether the two-factor challenge was completed for this session.
    #[serde(default)]
    pub two_factor_authenticated: bool,
    /// Expiry, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Encodes the claims as a base64url payload, the format
    /// [`BearerTokenValidator`] accepts. Intended for tests and tooling.
    #[must_use]
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("claims serialize to JSON");
        URL_SAFE_NO_PAD.encode(json)
    }
}

/// Validates bearer tokens carrying a base64url JSON claims payload.
///
/// Accepts either the bare payload or a dotted token (`header.payload.sig`),
/// in which case the second segment is decoded. A malformed payload, an
/// unknown role, or a past `exp` all fail with
/// [`PeiraError::Authentication`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerTokenValidator;

impl BearerTokenValidator {
    /// Creates a new bearer-token validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn decode(raw: &str) -> PeiraResult<TokenClaims> {
        // Dotted tokens carry the claims in the second segment.
        let payload = match raw.split('.').nth(1) {
            Some(segment) if raw.matches('.').count() == 2 => segment,
            _ => raw,
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| PeiraError::authentication("malformed credential"))?;

        serde_json::from_slice(&bytes)
            .map_err(|_| PeiraError::authentication("malformed credential"))
    }

    fn to_session(claims: TokenClaims) -> PeiraResult<Session> {
        if let Some(exp) = claims.exp {
            if exp <= Utc::now().timestamp() {
                return Err(PeiraError::authentication("credential expired"));
            }
        }

        let role: Role = claims
            .role
            .parse()
            .map_err(|_| PeiraError::authentication("credential carries an unknown role"))?;

        Ok(Session {
            subject_id: claims.sub,
            role,
            email: claims.email,
            email_verified: claims.email_verified,
            two_factor_enabled: claims.two_factor_enabled,
            two_factor_authenticated: claims.two_factor_authenticated,
        })
    }
}

impl CredentialValidator for BearerTokenValidator {
    fn validate<'a>(&'a self, raw: &'a str) -> BoxFuture<'a, PeiraResult<Option<Session>>> {
        Box::pin(async move {
            let claims = Self::decode(raw)?;
            Self::to_session(claims).map(Some)
        })
    }
}

/// A fixed token→session map for tests and local development.
///
/// Unknown tokens validate to `Ok(None)`; the resolver turns that into
/// an authentication failure.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialValidator {
    sessions: HashMap<String, Session>,
}

impl StaticCredentialValidator {
    /// Creates an empty validator that recognizes no credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token and the session it resolves to.
    #[must_use]
    pub fn with_session(mut self, token: impl Into<String>, session: Session) -> Self {
        self.sessions.insert(token.into(), session);
        self
    }
}

impl CredentialValidator for StaticCredentialValidator {
    fn validate<'a>(&'a self, raw: &'a str) -> BoxFuture<'a, PeiraResult<Option<Session>>> {
        Box::pin(async move { Ok(self.sessions.get(raw).cloned()) })
    }
}
