//! Error types for runtime primitives.
//!
//! Internal invariant violations (reference count underflow, inconsistent
//! cancellation bookkeeping) are programming errors and stay assertions; the
//! error enum covers the recoverable surface: configuration and builders.

use thiserror::Error;

/// Errors produced by configuration parsing and pool construction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A named pool was requested but not configured.
    #[error("unknown pool: {0}")]
    UnknownPool(String),
    /// Factory or backend failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
