//! Structured logging bootstrap for Peira services.
//!
//! The pipeline records everything through `tracing`; this crate wires
//! the subscriber. Production gets JSON lines, development gets a
//! pretty format, both behind an `EnvFilter`.
//!
//! # Example
//!
//! ```rust,ignore
//! use peira_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default())?;
//! tracing::info!(request_id = %id, path = "/projects", "request received");
//! ```

#![doc(html_root_url = "https://docs.rs/peira-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod logging;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};

/// Result type alias using [`TelemetryError`].
pub type TelemetryResult<T> = Result<T, TelemetryError>;
