//! # Metrics
//!
//! Prometheus metrics for the identity resolver and the lifecycle reconciler.
//!
//! ## Metrics Exposed
//!
//! - `keyvault_resolver_cache_hits_total` - Resolutions answered from the cache
//! - `keyvault_resolver_cache_misses_total` - Resolutions that needed a remote lookup
//! - `keyvault_resolver_remote_lookups_total` - Remote lookups by operation (`get`, `list`)
//! - `keyvault_lifecycle_operations_total` - Lifecycle phases by outcome (`success`, `error`)
//! - `keyvault_lifecycle_poll_duration_seconds` - Time spent polling per phase

use crate::error::Phase;
use anyhow::{Context, Result};
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static CACHE_HITS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "keyvault_resolver_cache_hits_total",
        "Total number of vault resolutions answered from the cache",
    )
    .expect("Failed to create CACHE_HITS_TOTAL metric - this should never happen")
});

static CACHE_MISSES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "keyvault_resolver_cache_misses_total",
        "Total number of vault resolutions that required a remote lookup",
    )
    .expect("Failed to create CACHE_MISSES_TOTAL metric - this should never happen")
});

static REMOTE_LOOKUPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "keyvault_resolver_remote_lookups_total",
            "Total number of remote lookups issued by the resolver by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create REMOTE_LOOKUPS_TOTAL metric - this should never happen")
});

static LIFECYCLE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "keyvault_lifecycle_operations_total",
            "Total number of lifecycle phases by outcome",
        ),
        &["phase", "outcome"],
    )
    .expect("Failed to create LIFECYCLE_OPERATIONS_TOTAL metric - this should never happen")
});

static LIFECYCLE_POLL_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "keyvault_lifecycle_poll_duration_seconds",
            "Time spent waiting for a lifecycle transition to become observable",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 900.0, 1800.0]),
        &["phase"],
    )
    .expect("Failed to create LIFECYCLE_POLL_DURATION metric - this should never happen")
});

/// Register all metrics with the registry
///
/// Calling this more than once is harmless.
///
/// # Errors
/// Returns an error if a metric cannot be registered for a reason other than
/// already being registered
pub fn register_metrics() -> Result<()> {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(CACHE_HITS_TOTAL.clone()),
        Box::new(CACHE_MISSES_TOTAL.clone()),
        Box::new(REMOTE_LOOKUPS_TOTAL.clone()),
        Box::new(LIFECYCLE_OPERATIONS_TOTAL.clone()),
        Box::new(LIFECYCLE_POLL_DURATION.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e).context("Failed to register metric"),
        }
    }
    Ok(())
}

/// Render every registered metric in the Prometheus text format
///
/// # Errors
/// Returns an error if encoding fails
pub fn encode_metrics() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output was not valid UTF-8")
}

pub fn increment_cache_hits() {
    CACHE_HITS_TOTAL.inc();
}

pub fn increment_cache_misses() {
    CACHE_MISSES_TOTAL.inc();
}

/// Count a remote lookup issued by the resolver (`get` or `list`)
pub fn increment_remote_lookups(operation: &str) {
    REMOTE_LOOKUPS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn record_lifecycle_operation(phase: Phase, success: bool) {
    let outcome = if success { "success" } else { "error" };
    LIFECYCLE_OPERATIONS_TOTAL
        .with_label_values(&[phase.as_str(), outcome])
        .inc();
}

pub fn observe_poll_duration(phase: Phase, duration: f64) {
    LIFECYCLE_POLL_DURATION
        .with_label_values(&[phase.as_str()])
        .observe(duration);
}
