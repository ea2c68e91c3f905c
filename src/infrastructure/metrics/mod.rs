//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connections
//! - Realtime events broadcast, by event name
//! - Failed realtime deliveries
//! - Messages created, by origin (http / websocket)

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "websocket_connections_active",
            "Number of registered WebSocket connections",
        )
        .namespace("thread_chat"),
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Broadcast counter - one increment per event fanned out to a thread
pub static EVENTS_BROADCAST_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_broadcast_total", "Realtime events broadcast to threads")
            .namespace("thread_chat"),
        &["event"],
    )
    .expect("Failed to create EVENTS_BROADCAST_TOTAL metric")
});

/// Deliveries that failed because the connection was gone
pub static DELIVERY_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "delivery_failures_total",
            "Realtime deliveries dropped because the connection had closed",
        )
        .namespace("thread_chat"),
    )
    .expect("Failed to create DELIVERY_FAILURES_TOTAL metric")
});

/// Messages created counter
pub static MESSAGES_CREATED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_created_total", "Messages created").namespace("thread_chat"),
        &["origin"],
    )
    .expect("Failed to create MESSAGES_CREATED_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(EVENTS_BROADCAST_TOTAL.clone()))
        .expect("Failed to register EVENTS_BROADCAST_TOTAL");
    registry
        .register(Box::new(DELIVERY_FAILURES_TOTAL.clone()))
        .expect("Failed to register DELIVERY_FAILURES_TOTAL");
    registry
        .register(Box::new(MESSAGES_CREATED_TOTAL.clone()))
        .expect("Failed to register MESSAGES_CREATED_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Helper to update the WebSocket connection gauge
pub fn set_websocket_connections(connected: usize) {
    WEBSOCKET_CONNECTIONS_ACTIVE.set(connected as i64);
}

/// Helper to record one broadcast and its failed deliveries
pub fn record_broadcast(event: &str, failed: usize) {
    EVENTS_BROADCAST_TOTAL.with_label_values(&[event]).inc();
    if failed > 0 {
        DELIVERY_FAILURES_TOTAL.inc_by(failed as u64);
    }
}

/// Helper to record a created message
pub fn record_message_created(origin: &str) {
    MESSAGES_CREATED_TOTAL.with_label_values(&[origin]).inc();
}
