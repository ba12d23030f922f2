// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, TextEncoder, register_counter, register_counter_vec,
    register_gauge, register_histogram,
};
use tracing::error;

lazy_static! {
    // --- Connection Gauges & Counters ---
    /// The number of clients currently connected to the server.
    pub static ref CONNECTED_CLIENTS: Gauge =
        register_gauge!("chatrelay_connected_clients", "Number of currently connected clients.").unwrap();
    /// The number of connections that have completed a login.
    pub static ref AUTHENTICATED_USERS: Gauge =
        register_gauge!("chatrelay_authenticated_users", "Number of logged-in users.").unwrap();
    /// The total number of connections accepted by the server since startup.
    pub static ref CONNECTIONS_RECEIVED_TOTAL: Counter =
        register_counter!("chatrelay_connections_received_total", "Total number of connections received.").unwrap();
    /// Connections closed immediately because `max_clients` was reached.
    pub static ref CONNECTIONS_REJECTED_TOTAL: Counter =
        register_counter!("chatrelay_connections_rejected_total", "Total number of connections rejected at the client limit.").unwrap();


    // --- Dispatch Counters ---
    /// Inbound messages processed, labeled by message type.
    pub static ref MESSAGES_PROCESSED_TOTAL: CounterVec =
        register_counter_vec!("chatrelay_messages_processed_total", "Total number of inbound messages processed.", &["type"]).unwrap();
    /// Messages rejected because clients may not send that type.
    pub static ref PROTOCOL_VIOLATIONS_TOTAL: Counter =
        register_counter!("chatrelay_protocol_violations_total", "Total number of protocol violations.").unwrap();
    /// Handler failures turned into error responses, labeled by error code.
    pub static ref HANDLER_ERRORS_TOTAL: CounterVec =
        register_counter_vec!("chatrelay_handler_errors_total", "Total number of handler errors, labeled by code.", &["code"]).unwrap();
    /// Events dropped because the ingestion queue was full or closed.
    pub static ref DROPPED_EVENTS_TOTAL: Counter =
        register_counter!("chatrelay_dropped_events_total", "Total number of inbound events dropped.").unwrap();
    /// Outbound sends the gateway refused.
    pub static ref SEND_FAILURES_TOTAL: Counter =
        register_counter!("chatrelay_send_failures_total", "Total number of outbound send failures.").unwrap();


    // --- File Transfer Counters ---
    pub static ref TRANSFERS_COMPLETED_TOTAL: Counter =
        register_counter!("chatrelay_transfers_completed_total", "Total number of file transfers completed.").unwrap();
    pub static ref TRANSFERS_FAILED_TOTAL: Counter =
        register_counter!("chatrelay_transfers_failed_total", "Total number of file transfers that failed or were cancelled.").unwrap();
    pub static ref BYTES_UPLOADED_TOTAL: Counter =
        register_counter!("chatrelay_bytes_uploaded_total", "Total number of file bytes accepted.").unwrap();


    // --- Histograms ---
    /// A histogram of per-message dispatch latencies.
    pub static ref DISPATCH_LATENCY_SECONDS: Histogram =
        register_histogram!("chatrelay_dispatch_latency_seconds", "Latency of message dispatch in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    match encoder.encode_to_string(&metric_families) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            String::new()
        }
    }
}
