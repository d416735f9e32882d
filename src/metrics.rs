//! Resolution metrics.
//!
//! Recorded through the `metrics` facade; when no recorder is installed (tests,
//! library embedding without an exporter) every call is a no-op.

use std::net::SocketAddr;
use tracing::{info, warn};

use crate::constants;

pub const RESOLUTION_OUTCOMES: &str = "venue_resolver_outcomes_total";
pub const RESOLUTION_CONFIDENCE: &str = "venue_resolver_top_confidence";
pub const RESOLUTION_DURATION: &str = "venue_resolver_duration_seconds";
pub const GENERATOR_FAILURES: &str = "venue_resolver_generator_failures_total";
pub const STORE_UNAVAILABLE: &str = "venue_resolver_store_unavailable_total";
pub const CYCLES_BLOCKED: &str = "venue_resolver_cycles_blocked_total";
pub const CACHE_HITS: &str = "venue_resolver_cache_hits_total";
pub const CACHE_MISSES: &str = "venue_resolver_cache_misses_total";
pub const CACHE_STALE_REDIRECTS: &str = "venue_resolver_cache_stale_redirects_total";

/// Install the Prometheus exporter when `VENUE_RESOLVER_METRICS_PORT` is set.
pub fn init_from_env() {
    let Some(port) = std::env::var(constants::ENV_METRICS_PORT)
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
    else {
        return;
    };
    install_exporter(port);
}

/// Must run inside a tokio runtime; the exporter serves `/metrics` on it.
pub fn install_exporter(port: u16) {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}

pub mod resolution {
    use super::*;

    pub fn outcome(label: &'static str) {
        ::metrics::counter!(RESOLUTION_OUTCOMES, "outcome" => label).increment(1);
    }

    pub fn top_confidence(confidence: f64) {
        ::metrics::histogram!(RESOLUTION_CONFIDENCE).record(confidence);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(RESOLUTION_DURATION).record(secs);
    }

    pub fn generator_failed(generator: &'static str) {
        ::metrics::counter!(GENERATOR_FAILURES, "generator" => generator).increment(1);
    }

    pub fn store_unavailable() {
        ::metrics::counter!(STORE_UNAVAILABLE).increment(1);
    }

    pub fn cycle_blocked() {
        ::metrics::counter!(CYCLES_BLOCKED).increment(1);
    }
}

pub mod cache {
    use super::*;

    pub fn hit() {
        ::metrics::counter!(CACHE_HITS).increment(1);
    }

    pub fn miss() {
        ::metrics::counter!(CACHE_MISSES).increment(1);
    }

    pub fn stale_redirect() {
        ::metrics::counter!(CACHE_STALE_REDIRECTS).increment(1);
    }
}
