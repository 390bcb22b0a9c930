#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Minimal metrics for the witness miner.
//!
//! Exposes a small set of Prometheus metrics for monitoring nonce search:
//! - `miner_nonce_rate`: Nonces tested per second since tracking started
//! - `miner_nonces_total`: Total nonces tested (all time)
//! - `miner_rounds_total`: Search rounds completed
//! - `miner_solutions_total`: Nonces found
//! - `miner_active_jobs`: Currently running searches (0 or 1)
//! - `miner_workers`: Worker thread count
//! - `miner_effective_cpus`: Detected CPU cores
//!
//! Optionally runs a Warp-based HTTP endpoint (`/metrics`) when the
//! `http-exporter` feature is enabled.

use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Mutex;
use std::time::Instant;

#[cfg(feature = "http-exporter")]
use {std::net::SocketAddr, warp::Filter};

// ---------------------------------------------------------------------------
// Global Registry
// ---------------------------------------------------------------------------

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

fn register_gauge(name: &str, help: &str) -> IntGauge {
    let g = IntGauge::new(name, help).unwrap_or_else(|e| panic!("create {name}: {e}"));
    REGISTRY
        .register(Box::new(g.clone()))
        .unwrap_or_else(|e| panic!("register {name}: {e}"));
    g
}

fn register_counter(name: &str, help: &str) -> IntCounter {
    let c = IntCounter::new(name, help).unwrap_or_else(|e| panic!("create {name}: {e}"));
    REGISTRY
        .register(Box::new(c.clone()))
        .unwrap_or_else(|e| panic!("register {name}: {e}"));
    c
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

static NONCE_RATE: Lazy<IntGauge> =
    Lazy::new(|| register_gauge("miner_nonce_rate", "Nonces tested per second"));

static NONCES_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| register_counter("miner_nonces_total", "Total nonces tested"));

static ROUNDS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter("miner_rounds_total", "Search rounds completed")
});

static SOLUTIONS_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| register_counter("miner_solutions_total", "Matching nonces found"));

static ACTIVE_JOBS: Lazy<IntGauge> = Lazy::new(|| {
    register_gauge(
        "miner_active_jobs",
        "Number of currently running nonce searches",
    )
});

static WORKERS: Lazy<IntGauge> =
    Lazy::new(|| register_gauge("miner_workers", "Number of worker threads"));

static EFFECTIVE_CPUS: Lazy<IntGauge> = Lazy::new(|| {
    register_gauge(
        "miner_effective_cpus",
        "Detected logical CPU cores available to this process",
    )
});

// ---------------------------------------------------------------------------
// Rate Tracking
// ---------------------------------------------------------------------------

/// Tracks cumulative nonces to compute a rolling rate.
struct RateTracker {
    total: u64,
    start_time: Instant,
}

impl RateTracker {
    fn new() -> Self {
        Self {
            total: 0,
            start_time: Instant::now(),
        }
    }

    fn record(&mut self, nonces: u64) {
        self.total += nonces;
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            NONCE_RATE.set((self.total as f64 / elapsed) as i64);
        }
    }

    fn reset(&mut self) {
        self.total = 0;
        self.start_time = Instant::now();
        NONCE_RATE.set(0);
    }
}

static RATE_TRACKER: Lazy<Mutex<RateTracker>> = Lazy::new(|| Mutex::new(RateTracker::new()));

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Record tested nonces and update the rate gauge.
pub fn record_nonces(n: u64) {
    NONCES_TOTAL.inc_by(n);
    if let Ok(mut tracker) = RATE_TRACKER.lock() {
        tracker.record(n);
    }
}

/// Restart the rate window (the total counter is left alone).
pub fn reset_rate() {
    if let Ok(mut tracker) = RATE_TRACKER.lock() {
        tracker.reset();
    }
}

pub fn inc_rounds() {
    ROUNDS_TOTAL.inc();
}

pub fn inc_solutions() {
    SOLUTIONS_TOTAL.inc();
}

/// Set the number of active searches (0 or 1).
pub fn set_active_jobs(n: i64) {
    ACTIVE_JOBS.set(n);
}

pub fn set_workers(n: i64) {
    WORKERS.set(n);
}

pub fn set_effective_cpus(n: i64) {
    EFFECTIVE_CPUS.set(n);
}

pub fn nonces_total() -> u64 {
    NONCES_TOTAL.get()
}

pub fn rounds_total() -> u64 {
    ROUNDS_TOTAL.get()
}

/// Text exposition of every registered metric.
pub fn render() -> Result<String> {
    // Touch the statics so an idle process still reports every series.
    Lazy::force(&NONCE_RATE);
    Lazy::force(&NONCES_TOTAL);
    Lazy::force(&ROUNDS_TOTAL);
    Lazy::force(&SOLUTIONS_TOTAL);
    Lazy::force(&ACTIVE_JOBS);
    Lazy::force(&WORKERS);
    Lazy::force(&EFFECTIVE_CPUS);

    let encoder = TextEncoder::new();
    let mut buffer = Vec::with_capacity(4096);
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

// ---------------------------------------------------------------------------
// HTTP Exporter
// ---------------------------------------------------------------------------

/// Start the Prometheus HTTP exporter on `0.0.0.0:port`.
///
/// Spawns the exporter as a background task and returns immediately.
/// Serves plaintext metrics at `GET /metrics`.
#[cfg(feature = "http-exporter")]
pub async fn start_http_exporter(port: u16) -> Result<()> {
    let metrics_route = warp::path("metrics").and(warp::get()).map(|| {
        let body = render().unwrap_or_else(|e| {
            log::warn!("failed to encode metrics: {e}");
            String::new()
        });
        warp::http::Response::builder()
            .header("Content-Type", TextEncoder::new().format_type())
            .body(body)
    });

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    log::info!("Metrics exporter listening on {addr}");
    tokio::spawn(async move {
        warp::serve(metrics_route).run(addr).await;
    });

    Ok(())
}

/// No-op when HTTP exporter feature is disabled.
#[cfg(not(feature = "http-exporter"))]
pub async fn start_http_exporter(_port: u16) -> Result<()> {
    log::warn!(
        "metrics::start_http_exporter called but 'http-exporter' feature is disabled; ignoring"
    );
    Ok(())
}
