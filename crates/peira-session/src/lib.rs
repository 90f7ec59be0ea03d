//! # Peira Session
//!
//! Session resolution for the Peira pipeline.
//!
//! Given the raw credential a request carries (a bearer token or session
//! cookie value), the [`SessionResolver`] produces a
//! [`Caller`](peira_core::Caller): a fully-populated session or the
//! anonymous caller. An absent credential is the anonymous state, never
//! an error; a present-but-invalid credential is an authentication
//! failure.
//!
//! Actual credential verification is delegated to a
//! [`CredentialValidator`] collaborator. Two implementations ship here:
//!
//! - [`BearerTokenValidator`] - decodes the platform's session-token
//!   claims payload and enforces structure and expiry
//! - [`StaticCredentialValidator`] - fixed token→session map for tests
//!   and development

#![doc(html_root_url = "https://docs.rs/peira-session/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod resolver;
mod token;

pub use resolver::{BoxFuture, CredentialValidator, SessionResolver};
pub use token::{BearerTokenValidator, StaticCredentialValidator, TokenClaims};
