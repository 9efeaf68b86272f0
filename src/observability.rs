//! Observability for the session engine
//!
//! Lightweight, Rust-native metrics using the `metrics` crate facade.
//! Recording is zero-cost when the `metrics` cargo feature is disabled;
//! exporter wiring (Prometheus or otherwise) is the embedding process's
//! concern.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tributary::observability::{init_tracing, SessionMetrics};
//!
//! // Once at startup
//! init_tracing();
//!
//! // Anywhere
//! SessionMetrics::increment_dispatches();
//! SessionMetrics::set_ready_partitions(4);
//! ```

/// Session engine metrics
pub struct SessionMetrics;

impl SessionMetrics {
    // ---- Counters ----

    /// Total messages dispatched to the handler
    pub fn increment_dispatches() {
        #[cfg(feature = "metrics")]
        metrics::counter!("tributary_dispatches_total").increment(1);
    }

    /// Total handler calls that reported a failure
    pub fn increment_handler_errors() {
        #[cfg(feature = "metrics")]
        metrics::counter!("tributary_handler_errors_total").increment(1);
    }

    /// Total offsets marked as consumed
    pub fn increment_marked_offsets() {
        #[cfg(feature = "metrics")]
        metrics::counter!("tributary_marked_offsets_total").increment(1);
    }

    /// Total claim loops started
    pub fn increment_claims_started() {
        #[cfg(feature = "metrics")]
        metrics::counter!("tributary_claims_started_total").increment(1);
    }

    /// Total permits waited for at the rate limiter gate
    pub fn increment_rate_limit_waits() {
        #[cfg(feature = "metrics")]
        metrics::counter!("tributary_rate_limit_waits_total").increment(1);
    }

    // ---- Gauges ----

    /// Number of partitions currently ready
    #[allow(unused_variables)]
    pub fn set_ready_partitions(count: usize) {
        #[cfg(feature = "metrics")]
        metrics::gauge!("tributary_ready_partitions").set(count as f64);
    }
}

/// Initialize tracing with an env-filter and a compact fmt layer.
///
/// Safe to call multiple times; later calls are no-ops. Honors
/// `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
