//! # Polling
//!
//! Waits for a lifecycle transition to become observable.
//!
//! A probe reports whether the resource is in the target state. The wait
//! succeeds once the probe has reported the target state
//! `required_consecutive_successes` times in a row; any other answer resets the
//! count. Each probe is bounded by the overall deadline, so a hung probe also
//! ends in [`Error::Timeout`].

use crate::error::{Error, Phase, Result};
use crate::observability::metrics;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::debug;

/// Stand-in for a deadline too far away to represent
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Parameters of a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait before the first probe
    pub delay: Duration,
    /// Wait between probes
    pub interval: Duration,
    /// Overall deadline, measured from the start of the wait including `delay`
    pub timeout: Duration,
    /// Target-state observations in a row needed to finish; `0` is treated as `1`
    pub required_consecutive_successes: u32,
}

impl PollConfig {
    /// Single-observation polling without an initial delay
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            delay: Duration::ZERO,
            interval,
            timeout,
            required_consecutive_successes: 1,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_required_consecutive_successes(mut self, required: u32) -> Self {
        self.required_consecutive_successes = required;
        self
    }
}

/// Probe until it reports the target state often enough in a row
///
/// `resource` and `target` only label logs and the timeout error.
///
/// # Errors
/// - [`Error::Timeout`] when the deadline passes first. A zero timeout fails
///   without probing.
/// - Any error returned by `probe`, unchanged.
pub async fn wait_for_state<F, Fut>(
    resource: &str,
    phase: Phase,
    target: &str,
    config: &PollConfig,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let deadline = saturating_after(start, config.timeout);
    let required = config.required_consecutive_successes.max(1);
    let timed_out = || Error::Timeout {
        resource: resource.to_string(),
        phase,
        target: target.to_string(),
        timeout: config.timeout,
    };

    if config.timeout.is_zero() {
        return Err(timed_out());
    }

    if !config.delay.is_zero() {
        let first_probe = saturating_after(start, config.delay);
        if first_probe >= deadline {
            sleep_until(deadline).await;
            return Err(timed_out());
        }
        sleep_until(first_probe).await;
    }

    let mut consecutive = 0_u32;
    let mut probes = 0_u32;
    let result = loop {
        let Ok(observed) = timeout_at(deadline, probe()).await else {
            break Err(timed_out());
        };
        probes += 1;

        match observed {
            Ok(true) => {
                consecutive += 1;
                debug!(
                    probe = probes,
                    consecutive, required, "{resource} observed {target}"
                );
                if consecutive >= required {
                    break Ok(());
                }
            }
            Ok(false) => {
                if consecutive > 0 {
                    debug!(probe = probes, "{resource} left {target}, resetting count");
                }
                consecutive = 0;
            }
            Err(e) => break Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            break Err(timed_out());
        }
        sleep_until(saturating_after(now, config.interval).min(deadline)).await;
    };

    metrics::observe_poll_duration(phase, start.elapsed().as_secs_f64());
    result
}

fn saturating_after(instant: Instant, duration: Duration) -> Instant {
    instant
        .checked_add(duration)
        .unwrap_or_else(|| instant + FAR_FUTURE)
}
