//! Throughput-capping handler decorator
//!
//! [`RateLimitedHandler`] implements the same [`MessageHandler`] contract
//! as the handler it wraps: `handle` waits for a pacing permit, then
//! delegates verbatim; the other two operations delegate directly.
//! Permits are granted on a fixed cadence of one per `1/rate` seconds and
//! are never banked, so throughput cannot burst above the target rate and
//! dispatches are serialized to at most one per tick.
//!
//! The pacing task is tied to the limiter's lifetime: dropping the
//! limiter stops it, releasing its timer instead of leaking a task that
//! runs until process exit.

use crate::error::{EngineError, Result};
use crate::handler::{DispatchContext, Disposition, MessageHandler};
use crate::message::Message;
use crate::observability::SessionMetrics;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

/// A waiter's reply channel; granting the permit completes the wait.
type Ticket = oneshot::Sender<()>;

/// Rate-limiting decorator around another [`MessageHandler`]
pub struct RateLimitedHandler {
    inner: Arc<dyn MessageHandler>,
    tickets: mpsc::Sender<Ticket>,
    shutdown: watch::Sender<bool>,
    tick: Duration,
}

impl RateLimitedHandler {
    /// Wrap `inner`, capping dispatch throughput at `rate` messages per
    /// second. `rate` must be positive.
    pub fn new(rate: u32, inner: Arc<dyn MessageHandler>) -> Result<Self> {
        if rate == 0 {
            return Err(EngineError::InvalidConfig(
                "rate limit must be positive".to_string(),
            ));
        }
        let tick = Duration::from_secs_f64(1.0 / f64::from(rate));

        // Tokio has no zero-capacity channel, so the unbuffered gate is a
        // ticketed rendezvous: a dispatcher enqueues its reply channel
        // and the pacer sleeps one full tick before each grant. Permits
        // therefore never accumulate while the gate is idle.
        let (ticket_tx, mut ticket_rx) = mpsc::channel::<Ticket>(1);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            loop {
                let ticket = tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    ticket = ticket_rx.recv() => match ticket {
                        Some(ticket) => ticket,
                        None => break,
                    },
                };
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(tick) => {}
                }
                // The waiter may have given up in the meantime
                let _ = ticket.send(());
            }
            debug!("rate limiter pacing task stopped");
        });

        Ok(Self {
            inner,
            tickets: ticket_tx,
            shutdown: shutdown_tx,
            tick,
        })
    }

    /// Interval between permits
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Wait for the next pacing permit
    async fn acquire(&self) -> Result<()> {
        SessionMetrics::increment_rate_limit_waits();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tickets
            .send(reply_tx)
            .await
            .map_err(|_| EngineError::LimiterStopped)?;
        reply_rx.await.map_err(|_| EngineError::LimiterStopped)?;
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for RateLimitedHandler {
    async fn handle(&self, ctx: &DispatchContext, message: &Message) -> Disposition {
        if let Err(error) = self.acquire().await {
            // The pacer only stops when the limiter is being torn down;
            // report without marking so the message is redelivered.
            return Disposition::retry(error);
        }
        self.inner.handle(ctx, message).await
    }

    fn set_ready(&self, partition: u32, ready: bool) {
        self.inner.set_ready(partition, ready);
    }

    fn consumer_group(&self) -> &str {
        self.inner.consumer_group()
    }
}

impl Drop for RateLimitedHandler {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct TimestampingHandler {
        group: String,
        calls: Mutex<Vec<Instant>>,
    }

    impl TimestampingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                group: "throttled-group".to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MessageHandler for TimestampingHandler {
        async fn handle(&self, _ctx: &DispatchContext, _message: &Message) -> Disposition {
            self.calls.lock().unwrap().push(Instant::now());
            Disposition::ack()
        }

        fn set_ready(&self, _partition: u32, _ready: bool) {}

        fn consumer_group(&self) -> &str {
            &self.group
        }
    }

    fn test_message(offset: u64) -> Message {
        Message::new("events", 0, offset, Bytes::from_static(b"v"))
    }

    #[test]
    fn test_zero_rate_rejected() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let inner = TimestampingHandler::new();
            assert!(RateLimitedHandler::new(0, inner).is_err());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_delegate_call_spacing_never_below_tick() {
        let inner = TimestampingHandler::new();
        let limited = RateLimitedHandler::new(10, inner.clone()).unwrap();
        assert_eq!(limited.tick(), Duration::from_millis(100));

        let ctx = DispatchContext::with_timeout(Duration::from_secs(60));
        for offset in 0..5 {
            let disposition = limited.handle(&ctx, &test_message(offset)).await;
            assert!(disposition.must_mark);
        }

        let calls = inner.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 5);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(99));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_burst_after_idle() {
        let inner = TimestampingHandler::new();
        let limited = RateLimitedHandler::new(10, inner.clone()).unwrap();

        // Long idle period must not bank permits
        tokio::time::advance(Duration::from_secs(5)).await;

        let started = Instant::now();
        let ctx = DispatchContext::with_timeout(Duration::from_secs(60));
        limited.handle(&ctx, &test_message(0)).await;
        limited.handle(&ctx, &test_message(1)).await;

        let calls = inner.calls.lock().unwrap().clone();
        assert!(calls[0] - started >= Duration::from_millis(99));
        assert!(calls[1] - calls[0] >= Duration::from_millis(99));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delegation_is_verbatim() {
        let inner = TimestampingHandler::new();
        let limited = RateLimitedHandler::new(100, inner.clone()).unwrap();

        assert_eq!(limited.consumer_group(), "throttled-group");
        limited.set_ready(3, true); // must not panic, delegates to no-op

        let ctx = DispatchContext::with_timeout(Duration::from_secs(60));
        let disposition = limited.handle(&ctx, &test_message(7)).await;
        assert!(disposition.must_mark);
        assert!(!disposition.failed());
        assert_eq!(inner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_task_stops_on_drop() {
        let inner = TimestampingHandler::new();
        let limited = RateLimitedHandler::new(10, inner).unwrap();
        let tickets = limited.tickets.clone();
        drop(limited);

        // Give the pacer a chance to observe the shutdown signal
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;

        // Pacer is gone: a fresh ticket is never answered
        let (reply_tx, reply_rx) = oneshot::channel();
        if tickets.send(reply_tx).await.is_ok() {
            assert!(reply_rx.await.is_err());
        }
    }
}
