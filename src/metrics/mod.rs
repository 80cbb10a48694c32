//! Prometheus metrics for the topology discoverer
//!
//! Exposes metrics via HTTP endpoint for Prometheus scraping.

use prometheus::{
    GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry,
};
use std::sync::OnceLock;

/// Global metrics registry
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Discoverer metrics collection
pub struct Metrics {
    /// Registry for all metrics
    pub registry: Registry,

    /// Total discovery cycles completed
    pub discovery_cycles_total: IntCounter,
    /// Wall time of a full discovery cycle (in seconds)
    pub discovery_cycle_duration_seconds: Histogram,
    /// Probe failures by reason
    pub probe_failures_total: IntCounterVec,
    /// Current host counts by role
    pub hosts: IntGaugeVec,
    /// Current number of alive hosts
    pub alive_hosts: IntGauge,
    /// Last observed probe round-trip time per host
    pub probe_rtt_seconds: GaugeVec,
}

impl Metrics {
    /// Create a new metrics collection
    pub fn new() -> Self {
        let registry = Registry::new();

        let discovery_cycles_total = IntCounter::new(
            "pgtopo_discovery_cycles_total",
            "Total number of discovery cycles completed",
        )
        .unwrap();

        let discovery_cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pgtopo_discovery_cycle_duration_seconds",
                "Wall time of a full discovery cycle in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )
        .unwrap();

        let probe_failures_total = IntCounterVec::new(
            Opts::new(
                "pgtopo_probe_failures_total",
                "Total number of failed host probes by reason",
            ),
            &["reason"], // connect, query, timeout
        )
        .unwrap();

        let hosts = IntGaugeVec::new(
            Opts::new("pgtopo_hosts", "Current number of hosts by role"),
            &["role"], // master, sync_slave, slave
        )
        .unwrap();

        let alive_hosts = IntGauge::new(
            "pgtopo_alive_hosts",
            "Current number of hosts reachable by probes",
        )
        .unwrap();

        let probe_rtt_seconds = GaugeVec::new(
            Opts::new(
                "pgtopo_probe_rtt_seconds",
                "Last observed probe round-trip time per host",
            ),
            &["host"],
        )
        .unwrap();

        registry
            .register(Box::new(discovery_cycles_total.clone()))
            .unwrap();
        registry
            .register(Box::new(discovery_cycle_duration_seconds.clone()))
            .unwrap();
        registry
            .register(Box::new(probe_failures_total.clone()))
            .unwrap();
        registry.register(Box::new(hosts.clone())).unwrap();
        registry.register(Box::new(alive_hosts.clone())).unwrap();
        registry
            .register(Box::new(probe_rtt_seconds.clone()))
            .unwrap();

        Self {
            registry,
            discovery_cycles_total,
            discovery_cycle_duration_seconds,
            probe_failures_total,
            hosts,
            alive_hosts,
            probe_rtt_seconds,
        }
    }

    /// Record a completed discovery cycle
    pub fn record_discovery_cycle(&self, duration_secs: f64) {
        self.discovery_cycles_total.inc();
        self.discovery_cycle_duration_seconds.observe(duration_secs);
    }

    /// Record a failed host probe
    pub fn record_probe_failure(&self, reason: &str) {
        self.probe_failures_total.with_label_values(&[reason]).inc();
    }

    /// Update per-role host counts
    pub fn set_host_counts(&self, masters: i64, sync_slaves: i64, slaves: i64, alive: i64) {
        self.hosts.with_label_values(&["master"]).set(masters);
        self.hosts.with_label_values(&["sync_slave"]).set(sync_slaves);
        self.hosts.with_label_values(&["slave"]).set(slaves);
        self.alive_hosts.set(alive);
    }

    /// Update the last observed round-trip time for a host
    pub fn set_probe_rtt(&self, host: &str, rtt_secs: f64) {
        self.probe_rtt_seconds.with_label_values(&[host]).set(rtt_secs);
    }

    /// Get metrics as Prometheus text format
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(addr: &str) -> anyhow::Result<()> {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tracing::{error, info};

    async fn handle_request(
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        match req.uri().path() {
            "/metrics" => {
                let body = metrics().gather();
                Ok(Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                    .body(Full::new(Bytes::from(body)))
                    .unwrap())
            }
            "/health" => Ok(Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from("OK")))
                .unwrap()),
            _ => Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Full::new(Bytes::from("Not Found")))
                .unwrap()),
        }
    }

    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Metrics server listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_request))
                .await
            {
                error!(error = %e, "Metrics server connection error");
            }
        });
    }
}
