//! # Playback Error Types
//!
//! The error taxonomy of the control core. Every failure that can surface to
//! the UI is classified into one of four buckets; everything else stays
//! internal.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback control operations.
#[derive(Error, Debug)]
pub enum PlayerError {
    // ========================================================================
    // Surfaced Classes
    // ========================================================================
    /// The resource has no playable quality levels (or does not exist).
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// A connectivity or timeout problem that internal retry/recovery may
    /// resolve.
    #[error("Network error: {0}")]
    NetworkTransient(String),

    /// The native engine rejected an open/seek/control call unexpectedly.
    #[error("Engine failure: {0}")]
    EngineFailure(String),

    // ========================================================================
    // Internal Classes
    // ========================================================================
    /// An operation completed after being superseded by a newer epoch.
    /// Expected traffic in an epoch/debounce system; never surfaced and never
    /// logged as an error.
    #[error("Operation superseded by a newer request")]
    CancelledStale,

    /// Invariant violation inside the core (should not occur in normal
    /// operation).
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error while materializing a playlist document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BridgeError> for PlayerError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::UnknownResource(msg) => PlayerError::ResourceUnavailable(msg),
            e if e.is_transient() => PlayerError::NetworkTransient(e.to_string()),
            BridgeError::Io(io) => PlayerError::Io(io),
            e => PlayerError::EngineFailure(e.to_string()),
        }
    }
}

impl PlayerError {
    /// Returns `true` if this error is transient and internal retry or stall
    /// recovery may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlayerError::NetworkTransient(_))
    }

    /// Returns `true` if this is the expected superseded-operation outcome.
    pub fn is_stale(&self) -> bool {
        matches!(self, PlayerError::CancelledStale)
    }

    /// Classified, user-facing error text. Stale cancellations have no
    /// user-facing form and return `None`.
    pub fn classify(&self) -> Option<ClassifiedError> {
        match self {
            PlayerError::ResourceUnavailable(msg) => Some(ClassifiedError {
                message: format!("This video is unavailable: {}", msg),
                recoverable: false,
            }),
            PlayerError::NetworkTransient(msg) => Some(ClassifiedError {
                message: format!("Network trouble: {}", msg),
                recoverable: true,
            }),
            PlayerError::EngineFailure(msg) => Some(ClassifiedError {
                message: format!("Playback failed: {}", msg),
                recoverable: true,
            }),
            PlayerError::Io(err) => Some(ClassifiedError {
                message: format!("Playback failed: {}", err),
                recoverable: true,
            }),
            PlayerError::Internal(msg) => Some(ClassifiedError {
                message: format!("Playback failed: {}", msg),
                recoverable: false,
            }),
            PlayerError::CancelledStale => None,
        }
    }
}

/// A user-facing error with a retry hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub message: String,
    pub recoverable: bool,
}

/// Result type for playback control operations.
pub type Result<T> = std::result::Result<T, PlayerError>;
