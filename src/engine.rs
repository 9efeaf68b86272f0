//! Consumer-group session engine
//!
//! Implements the three entry points the group-membership framework
//! invokes for each generation:
//! - `setup` once before any claim loop
//! - `consume_claim` once per assigned partition, concurrently
//! - `cleanup` once after every claim loop has returned
//!
//! The engine owns per-partition readiness, dispatches messages to the
//! pluggable [`MessageHandler`] under a per-call deadline, and forwards
//! handler failures to an externally owned error sink. It performs no
//! retry or backoff; redelivery policy is encoded entirely in the
//! handler's [`Disposition`](crate::handler::Disposition).

use crate::config::{EngineConfig, DEFAULT_HANDLER_TIMEOUT};
use crate::error::{EngineError, Result};
use crate::handler::{DispatchContext, LifecycleHook, MessageHandler, NoopLifecycle};
use crate::observability::SessionMetrics;
use crate::readiness::ReadinessMap;
use crate::session::{Claim, Session};
use crate::throttle::RateLimitedHandler;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-instance consumption session engine
pub struct SessionEngine {
    handler: Arc<dyn MessageHandler>,
    lifecycle: Arc<dyn LifecycleHook>,
    handler_timeout: Duration,
    errors: mpsc::Sender<EngineError>,
    readiness: Arc<ReadinessMap>,
}

impl SessionEngine {
    /// Start building an engine around a handler and an error sink.
    ///
    /// The sink is owned by the caller: producers block once it is full,
    /// so whoever holds the `Receiver` decides the draining policy.
    pub fn builder(
        handler: Arc<dyn MessageHandler>,
        errors: mpsc::Sender<EngineError>,
    ) -> SessionEngineBuilder {
        SessionEngineBuilder {
            handler,
            errors,
            lifecycle: None,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// Build an engine from configuration, wrapping the handler in a
    /// rate limiter when `rate_limit` is set.
    pub fn from_config(
        handler: Arc<dyn MessageHandler>,
        errors: mpsc::Sender<EngineError>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let handler = match config.rate_limit {
            Some(rate) => {
                Arc::new(RateLimitedHandler::new(rate, handler)?) as Arc<dyn MessageHandler>
            }
            None => handler,
        };
        Ok(Self::builder(handler, errors)
            .handler_timeout(config.handler_timeout)
            .build())
    }

    /// Readiness map for external health/scheduling readers
    pub fn readiness(&self) -> Arc<ReadinessMap> {
        Arc::clone(&self.readiness)
    }

    /// Consumer group this engine consumes on behalf of
    pub fn consumer_group(&self) -> &str {
        self.handler.consumer_group()
    }

    /// Called once at the start of a generation, before any claim loop.
    ///
    /// Performs no readiness mutation.
    pub async fn setup(&self, session: &Session) -> Result<()> {
        info!(
            generation = session.generation(),
            group = self.handler.consumer_group(),
            "setting up session"
        );
        self.lifecycle.setup(session).await;
        Ok(())
    }

    /// Called once at the end of a generation, after every claim loop
    /// has returned.
    ///
    /// Group-membership semantics guarantee no claim loop still writes
    /// readiness for this generation's partitions when this runs.
    pub async fn cleanup(&self, session: &Session) -> Result<()> {
        info!(generation = session.generation(), "cleaning up session");
        for (topic, partitions) in session.claims() {
            for &partition in partitions {
                debug!(topic, partition, "cleanup: marking partition not ready");
                self.set_ready(partition, false);
            }
        }
        self.lifecycle.cleanup(session).await;
        Ok(())
    }

    /// Consume one partition's claim for this generation.
    ///
    /// Invoked as an independent task per assigned partition; instances
    /// run concurrently with each other but never for the same partition
    /// within one generation.
    pub async fn consume_claim(&self, session: &Session, mut claim: Claim) -> Result<()> {
        info!(
            topic = claim.topic(),
            partition = claim.partition(),
            initial_offset = claim.initial_offset(),
            group = self.handler.consumer_group(),
            "starting partition consumer"
        );
        SessionMetrics::increment_claims_started();
        self.set_ready(claim.partition(), true);

        while let Some(message) = claim.next_message().await {
            debug!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "message claimed"
            );

            // Stop picking up new work once the generation is closing.
            // Draining the buffered backlog can exceed the rebalance
            // deadline and cause duplicate delivery after reassignment.
            if session.is_closing() {
                info!(
                    topic = claim.topic(),
                    partition = claim.partition(),
                    "session closing, exiting claim loop"
                );
                break;
            }

            // Fresh per-dispatch context, independent of the session's
            // close signal: an in-flight call always runs to completion
            // or its own deadline.
            let ctx = DispatchContext::with_timeout(self.handler_timeout);
            let disposition = self.handler.handle(&ctx, &message).await;
            SessionMetrics::increment_dispatches();

            if let Some(error) = disposition.error {
                warn!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    %error,
                    "failure while handling a message"
                );
                SessionMetrics::increment_handler_errors();
                self.set_ready(claim.partition(), false);
                // Blocking send: an unconsumed sink stalls this loop on
                // purpose, pushing backpressure to the sink's owner.
                self.errors
                    .send(error)
                    .await
                    .map_err(|_| EngineError::ErrorSinkClosed)?;
            }

            // Commit is independent of failure: a handler may park a
            // poison pill (mark despite error) or force redelivery
            // (no mark on transient error).
            if disposition.must_mark {
                session.mark(&message);
                SessionMetrics::increment_marked_offsets();
                debug!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    "offset marked"
                );
            }
        }

        info!(
            topic = claim.topic(),
            partition = claim.partition(),
            "stopping partition consumer"
        );
        Ok(())
    }

    fn set_ready(&self, partition: u32, ready: bool) {
        self.readiness.set(partition, ready);
        self.handler.set_ready(partition, ready);
        SessionMetrics::set_ready_partitions(self.readiness.ready_partitions().len());
    }
}

/// Builder for [`SessionEngine`]
pub struct SessionEngineBuilder {
    handler: Arc<dyn MessageHandler>,
    errors: mpsc::Sender<EngineError>,
    lifecycle: Option<Arc<dyn LifecycleHook>>,
    handler_timeout: Duration,
}

impl SessionEngineBuilder {
    /// Install a lifecycle hook (default: no-op)
    pub fn lifecycle(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.lifecycle = Some(hook);
        self
    }

    /// Budget for a single handler call (default: 60 s)
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Build the engine
    pub fn build(self) -> SessionEngine {
        SessionEngine {
            handler: self.handler,
            errors: self.errors,
            lifecycle: self
                .lifecycle
                .unwrap_or_else(|| Arc::new(NoopLifecycle)),
            handler_timeout: self.handler_timeout,
            readiness: Arc::new(ReadinessMap::new()),
        }
    }
}
