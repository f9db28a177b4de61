use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: write operations decided. Labels: op, outcome.
pub const WRITES_TOTAL: &str = "staylock_writes_total";

/// Counter: writes rejected with a conflict.
pub const CONFLICTS_TOTAL: &str = "staylock_conflicts_total";

/// Counter: writes rejected before the overlap scan (malformed range).
pub const INVALID_RANGES_TOTAL: &str = "staylock_invalid_ranges_total";

/// Histogram: admission check-then-write latency in seconds. Labels: op.
pub const WRITE_DURATION_SECONDS: &str = "staylock_write_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
