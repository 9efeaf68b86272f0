//! Engine configuration

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Default budget for a single handler call.
///
/// Matches the consumer-group rebalance timeout: a dispatch that runs
/// longer than this risks the member being evicted mid-call.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(60);

/// Default capacity for an engine-created error sink.
///
/// The sink applies backpressure once full, so the capacity decides how
/// many unconsumed failures may accumulate before claim loops stall.
/// Owners that drain the sink elsewhere should pick their own capacity
/// via [`EngineConfig::error_sink_capacity`].
pub const DEFAULT_ERROR_SINK_CAPACITY: usize = 16;

/// Configuration for a [`SessionEngine`](crate::SessionEngine)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Consumer group this instance joins
    pub consumer_group: String,

    /// Budget for a single handler call
    pub handler_timeout: Duration,

    /// Target dispatch rate in messages per second (None = unlimited)
    pub rate_limit: Option<u32>,

    /// Capacity of the error sink created by [`EngineConfig::error_sink`]
    pub error_sink_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            consumer_group: String::new(),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
            rate_limit: None,
            error_sink_capacity: DEFAULT_ERROR_SINK_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Create a configuration for the given consumer group
    pub fn new(consumer_group: impl Into<String>) -> Self {
        Self {
            consumer_group: consumer_group.into(),
            ..Default::default()
        }
    }

    /// Set the per-call handler timeout
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Cap dispatch throughput at `rate` messages per second
    pub fn rate_limit(mut self, rate: u32) -> Self {
        self.rate_limit = Some(rate);
        self
    }

    /// Set the capacity used by [`EngineConfig::error_sink`]
    pub fn error_sink_capacity(mut self, capacity: usize) -> Self {
        self.error_sink_capacity = capacity;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.consumer_group.is_empty() {
            return Err(EngineError::InvalidConfig(
                "consumer_group must not be empty".to_string(),
            ));
        }
        if self.handler_timeout.is_zero() {
            return Err(EngineError::InvalidConfig(
                "handler_timeout must be positive".to_string(),
            ));
        }
        if self.rate_limit == Some(0) {
            return Err(EngineError::InvalidConfig(
                "rate_limit must be positive when set".to_string(),
            ));
        }
        if self.error_sink_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "error_sink_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Create the error sink channel with the configured capacity.
    ///
    /// The engine keeps the `Sender`; the caller owns the `Receiver` and
    /// is responsible for draining it. Producers block once the channel
    /// is full.
    pub fn error_sink(&self) -> (mpsc::Sender<EngineError>, mpsc::Receiver<EngineError>) {
        mpsc::channel(self.error_sink_capacity)
    }
}
