//! Prometheus metrics for a validation session.
//!
//! [`SessionMetrics`] owns a dedicated [`Registry`] so several sessions (or
//! tests) can coexist in one process. [`SessionMetrics::encode`] renders it
//! in the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct SessionMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Fetch cycles started.
    pub fetch_cycles: IntCounter,
    /// Fetch cycles that ended in `FetchFlipsFailed`.
    pub fetch_failures: IntCounter,
    /// Epoch or timing polls that failed.
    pub poll_failures: IntCounter,
    /// Answer batches accepted by the node.
    pub submissions: IntCounter,
    /// Answer batches the node rejected or never received.
    pub submission_failures: IntCounter,
    /// Epoch changes observed.
    pub epoch_resets: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Flips currently marked failed.
    pub failed_flips: IntGauge,
    /// Seconds left in the current phase, -1 while unknown.
    pub remaining_seconds: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .unwrap_or_else(|e| panic!("failed to register {name}: {e}"))
}

fn gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
    register_int_gauge_with_registry!(Opts::new(name, help), registry)
        .unwrap_or_else(|e| panic!("failed to register {name}: {e}"))
}

impl SessionMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let fetch_cycles = counter(
            &registry,
            "ceremony_fetch_cycles_total",
            "Flip fetch cycles started",
        );
        let fetch_failures = counter(
            &registry,
            "ceremony_fetch_failures_total",
            "Flip fetch cycles that failed",
        );
        let poll_failures = counter(
            &registry,
            "ceremony_poll_failures_total",
            "Epoch and timing polls that failed",
        );
        let submissions = counter(
            &registry,
            "ceremony_submissions_total",
            "Answer batches accepted by the node",
        );
        let submission_failures = counter(
            &registry,
            "ceremony_submission_failures_total",
            "Answer batches that failed to submit",
        );
        let epoch_resets = counter(
            &registry,
            "ceremony_epoch_resets_total",
            "Epoch changes observed by the session",
        );
        let failed_flips = gauge(
            &registry,
            "ceremony_failed_flips",
            "Flips currently marked failed",
        );
        let remaining_seconds = gauge(
            &registry,
            "ceremony_remaining_seconds",
            "Seconds left in the current phase",
        );
        remaining_seconds.set(-1);

        Self {
            registry,
            fetch_cycles,
            fetch_failures,
            poll_failures,
            submissions,
            submission_failures,
            epoch_resets,
            failed_flips,
            remaining_seconds,
        }
    }

    /// Prometheus text exposition of every metric in the registry.
    pub fn encode(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
