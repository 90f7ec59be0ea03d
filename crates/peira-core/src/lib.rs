//! # Peira Core
//!
//! Core types for the Peira request pipeline.
//!
//! This crate provides the foundational types used throughout Peira:
//!
//! - [`RequestId`] - UUID v7 request identifier
//! - [`Session`] / [`Caller`] - Resolved caller identity for one request
//! - [`Role`] - Closed role enumeration for access control
//! - [`PeiraError`] - Closed error taxonomy
//! - [`NormalizedError`] - Canonical failure representation surfaced to clients

#![doc(html_root_url = "https://docs.rs/peira-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod session;

pub use context::RequestId;
pub use error::{
    ErrorBody, ErrorEnvelope, ErrorKind, NormalizedError, PeiraError, PeiraResult,
};
pub use session::{Caller, Role, Session};
