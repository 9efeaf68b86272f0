//! Handler contract between the session engine and business logic
//!
//! The engine is transport glue: everything that turns a message into an
//! outbound event lives behind [`MessageHandler`]. Decorators (such as the
//! rate limiter in [`throttle`](crate::throttle)) implement the same trait
//! and hold another implementer, so capabilities compose without the
//! engine knowing.

use crate::error::EngineError;
use crate::message::Message;
use crate::session::Session;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of dispatching one message.
///
/// Commit (`must_mark`) and failure (`error`) are independent axes: a
/// handler may request commit-on-permanent-failure to avoid poison-pill
/// redelivery, or no-commit-on-transient-failure to force redelivery.
/// Retry policy lives entirely here; the engine never retries.
#[derive(Debug, Default)]
pub struct Disposition {
    /// Mark this message's offset as consumed
    pub must_mark: bool,
    /// Processing failure to report to the error sink
    pub error: Option<EngineError>,
}

impl Disposition {
    /// Processed successfully; commit the offset.
    pub fn ack() -> Self {
        Self {
            must_mark: true,
            error: None,
        }
    }

    /// Not processed, no failure; leave the offset unmarked.
    pub fn skip() -> Self {
        Self {
            must_mark: false,
            error: None,
        }
    }

    /// Transient failure; leave the offset unmarked so the message is
    /// redelivered after the next rebalance.
    pub fn retry(error: EngineError) -> Self {
        Self {
            must_mark: false,
            error: Some(error),
        }
    }

    /// Permanent failure; commit the offset anyway so the message is
    /// never redelivered.
    pub fn park(error: EngineError) -> Self {
        Self {
            must_mark: true,
            error: Some(error),
        }
    }

    /// True if the dispatch reported a failure
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Execution budget for a single handler call.
///
/// Created fresh per dispatch and never derived from the session's close
/// signal: an in-flight call must not be interrupted by session-level
/// cancellation, which could leave external side effects half-applied.
/// The engine does not enforce the deadline; handlers observe it and
/// report an overrun through their own [`Disposition`].
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext {
    deadline: Instant,
    budget: Duration,
}

impl DispatchContext {
    /// Create a context whose deadline is `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            budget: timeout,
        }
    }

    /// Absolute deadline for this dispatch
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The full budget the context was created with
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time remaining before the deadline (zero once expired)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// True once the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// The error a handler should report when it ran out of budget
    pub fn deadline_error(&self) -> EngineError {
        EngineError::DeadlineExceeded {
            budget: self.budget,
        }
    }
}

/// Message handler contract
///
/// One abstract capability with three operations. Implemented by
/// business logic (message -> outbound event delivery) and by decorators
/// that wrap another implementer.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one message within the context's budget.
    ///
    /// Returning `must_mark = true` commits the offset regardless of
    /// whether an error is also reported.
    async fn handle(&self, ctx: &DispatchContext, message: &Message) -> Disposition;

    /// Readiness transition for a partition, mirrored by the engine
    fn set_ready(&self, partition: u32, ready: bool);

    /// Consumer group this handler consumes on behalf of
    fn consumer_group(&self) -> &str;
}

/// Optional hook into session lifecycle edges
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// Invoked once when the consumer joins a session, before any claim loop
    async fn setup(&self, session: &Session);

    /// Invoked once when the consumer leaves the session, after all claim loops
    async fn cleanup(&self, session: &Session);
}

/// Default no-op lifecycle hook
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLifecycle;

#[async_trait]
impl LifecycleHook for NoopLifecycle {
    async fn setup(&self, _session: &Session) {}

    async fn cleanup(&self, _session: &Session) {}
}
