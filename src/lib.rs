//! # Tributary
//!
//! Per-instance Kafka consumption session engine for a multi-tenant
//! eventing platform:
//! - **Session Engine**: owns one consumer-group generation, runs one
//!   ordered delivery loop per claimed partition against a pluggable
//!   handler, and tracks per-partition readiness for the placement layer
//! - **Rate Limiter**: a handler decorator that caps dispatch throughput
//!   on a fixed-tick permit gate
//! - **Placement Model**: read-only value operations over the
//!   scheduler's pod/replica assignments
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │              group-membership framework (external)        │
//! │   setup ──► consume_claim × N partitions ──► cleanup      │
//! └──────────────────────────┬────────────────────────────────┘
//!                            │
//!                    ┌───────▼────────┐   readiness   ┌─────────────┐
//!                    │ SessionEngine  ├──────────────►│ scheduler / │
//!                    │                │   placements  │ health      │
//!                    └───────┬────────┘◄──────────────┴─────────────┘
//!                            │ dispatch (per-call deadline)
//!                    ┌───────▼────────────┐
//!                    │ RateLimitedHandler │  (optional decorator)
//!                    └───────┬────────────┘
//!                    ┌───────▼────────┐
//!                    │ MessageHandler │  (business logic, external)
//!                    └────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tributary::{EngineConfig, SessionEngine};
//!
//! let config = EngineConfig::new("sources-group").rate_limit(500);
//! let (errors_tx, mut errors_rx) = config.error_sink();
//! let engine = Arc::new(SessionEngine::from_config(handler, errors_tx, &config)?);
//!
//! engine.setup(&session).await?;
//! for claim in claims {
//!     let engine = Arc::clone(&engine);
//!     let session = session.clone();
//!     tokio::spawn(async move { engine.consume_claim(&session, claim).await });
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod message;
pub mod observability;
pub mod placement;
pub mod readiness;
pub mod session;
pub mod throttle;

// Re-export main types
pub use config::{EngineConfig, DEFAULT_ERROR_SINK_CAPACITY, DEFAULT_HANDLER_TIMEOUT};
pub use engine::{SessionEngine, SessionEngineBuilder};
pub use error::{EngineError, Result};
pub use handler::{DispatchContext, Disposition, LifecycleHook, MessageHandler, NoopLifecycle};
pub use message::Message;
pub use observability::{init_tracing, SessionMetrics};
pub use placement::{
    copy_placements, placement_for_pod, total_replicas, Placement, Schedulable, Scheduler,
};
pub use readiness::ReadinessMap;
pub use session::{Claim, OffsetTracker, Session, SessionControl};
pub use throttle::RateLimitedHandler;
