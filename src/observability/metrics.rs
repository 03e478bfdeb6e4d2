//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hq_requests_total` (counter): requests whose head parsed successfully
//! - `hq_stream_aborts_total` (counter): stream aborts by `reason`
//! - `hq_response_bytes_total` (counter): response bytes submitted
//! - `hq_active_connections` (gauge): live connection handles
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::protocol::RequestErrorCode;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn request_received() {
    metrics::counter!("hq_requests_total").increment(1);
}

pub fn stream_aborted(code: RequestErrorCode) {
    metrics::counter!("hq_stream_aborts_total", "reason" => code.as_str()).increment(1);
}

pub fn response_bytes(n: usize) {
    metrics::counter!("hq_response_bytes_total").increment(n as u64);
}

pub fn connection_opened() {
    metrics::gauge!("hq_active_connections").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("hq_active_connections").decrement(1.0);
}
