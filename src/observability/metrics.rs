//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rdm_guard_rejections_total` (counter): rejections by guard and reason
//! - `rdm_active_tokens` (gauge): live session tokens
//! - `rdm_ws_connections` (gauge): registered WebSocket clients
//! - `rdm_ws_members_dropped_total` (counter): clients evicted on write failure
//! - `rdm_events_emitted_total` (counter): hub broadcasts
//! - `rdm_login_attempts_total` (counter): login outcomes
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

pub const GUARD_REJECTIONS_TOTAL: &str = "rdm_guard_rejections_total";
pub const ACTIVE_TOKENS: &str = "rdm_active_tokens";
pub const WS_CONNECTIONS: &str = "rdm_ws_connections";
pub const WS_MEMBERS_DROPPED_TOTAL: &str = "rdm_ws_members_dropped_total";
pub const EVENTS_EMITTED_TOTAL: &str = "rdm_events_emitted_total";
pub const LOGIN_ATTEMPTS_TOTAL: &str = "rdm_login_attempts_total";

/// Install the global Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_guard_rejection(guard: &'static str, reason: &'static str) {
    counter!(GUARD_REJECTIONS_TOTAL, "guard" => guard, "reason" => reason).increment(1);
}

pub fn record_token_count(count: usize) {
    gauge!(ACTIVE_TOKENS).set(count as f64);
}

pub fn record_ws_connections(count: usize) {
    gauge!(WS_CONNECTIONS).set(count as f64);
}

/// `reason` is `queue_full` or `closed`.
pub fn record_member_dropped(reason: &'static str) {
    counter!(WS_MEMBERS_DROPPED_TOTAL, "reason" => reason).increment(1);
}

pub fn record_event_emitted() {
    counter!(EVENTS_EMITTED_TOTAL).increment(1);
}

pub fn record_login(outcome: &'static str) {
    counter!(LOGIN_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}
