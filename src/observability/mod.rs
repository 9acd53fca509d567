//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Guards, token store, hub
//!     → logging.rs (structured log events, request-id spans)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
