//! Engine error types

use std::time::Duration;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by the session engine and its collaborators
#[derive(Debug, Error)]
pub enum EngineError {
    // ==================== Configuration Errors ====================
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ==================== Dispatch Errors ====================
    #[error("handler failure on {topic}/{partition} at offset {offset}: {reason}")]
    Handler {
        topic: String,
        partition: u32,
        offset: u64,
        reason: String,
    },

    #[error("dispatch deadline exceeded (budget {budget:?})")]
    DeadlineExceeded { budget: Duration },

    // ==================== Session Errors ====================
    #[error("session closed")]
    SessionClosed,

    #[error("claim revoked: {topic}/{partition}")]
    ClaimRevoked { topic: String, partition: u32 },

    // ==================== Scheduling Errors ====================
    #[error("scheduling failed for {entity}: {reason}")]
    SchedulingFailed { entity: String, reason: String },

    // ==================== Channel Errors ====================
    #[error("error sink closed")]
    ErrorSinkClosed,

    #[error("rate limiter stopped")]
    LimiterStopped,

    #[error("channel closed")]
    ChannelClosed,
}

impl EngineError {
    /// Errors reported by (or on behalf of) the message handler.
    ///
    /// These flow into the error sink; everything else surfaces through
    /// the entry points' return values.
    pub fn is_processing_failure(&self) -> bool {
        matches!(
            self,
            EngineError::Handler { .. } | EngineError::DeadlineExceeded { .. }
        )
    }

    /// Errors that mean the current generation is over and the claim
    /// loop cannot make further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineError::SessionClosed
                | EngineError::ClaimRevoked { .. }
                | EngineError::ErrorSinkClosed
                | EngineError::ChannelClosed
        )
    }

    /// Shorthand for a handler failure tied to a specific message.
    pub fn handler(topic: impl Into<String>, partition: u32, offset: u64, reason: impl Into<String>) -> Self {
        EngineError::Handler {
            topic: topic.into(),
            partition,
            offset,
            reason: reason.into(),
        }
    }
}

// Conversion from channel errors
impl<T> From<tokio::sync::mpsc::error::SendError<T>> for EngineError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        EngineError::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for EngineError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        EngineError::ChannelClosed
    }
}
