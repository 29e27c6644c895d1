//! Durable store errors and the fail-soft [`Outcome`] wrapper.

use thiserror::Error;
use tracing::warn;

/// Errors raised by storage engines.
#[derive(Error, Debug)]
pub enum DurableError {
    /// The engine rejected or failed a transaction
    #[error("Storage engine error: {0}")]
    Engine(String),

    /// The engine cannot be reached (closed, disabled, privacy mode)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A write would exceed the storage quota
    #[error("Storage quota exceeded: {used} of {quota} bytes")]
    QuotaExceeded { used: u64, quota: u64 },

    /// A record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking storage task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    Join(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for DurableError {
    fn from(e: heed::Error) -> Self {
        DurableError::Engine(e.to_string())
    }
}

impl From<tokio::task::JoinError> for DurableError {
    fn from(e: tokio::task::JoinError) -> Self {
        DurableError::Join(e.to_string())
    }
}

// == Outcome ==
/// Result of a durable store operation.
///
/// Storage failures never reach the caller as errors. Instead the operation
/// reports `Degraded` with the benign value a caller should act on (`false`,
/// `None`, an empty list) alongside the underlying reason.
#[must_use]
#[derive(Debug)]
pub enum Outcome<T> {
    Ok(T),
    Degraded { value: T, reason: DurableError },
}

impl<T> Outcome<T> {
    /// Builds an outcome from an engine result, logging and substituting
    /// `fallback` on failure.
    pub fn settle(operation: &str, result: Result<T, DurableError>, fallback: T) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(reason) => {
                warn!(operation, error = %reason, "durable store operation degraded");
                Outcome::Degraded {
                    value: fallback,
                    reason,
                }
            }
        }
    }

    /// The value to act on, degraded or not.
    pub fn into_value(self) -> T {
        match self {
            Outcome::Ok(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Ok(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&DurableError> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }

    /// Converts back into a strict `Result` for callers that want to branch on
    /// failure explicitly.
    pub fn into_result(self) -> Result<T, DurableError> {
        match self {
            Outcome::Ok(value) => Ok(value),
            Outcome::Degraded { reason, .. } => Err(reason),
        }
    }
}
