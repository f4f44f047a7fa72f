//! # Polling Defaults
//!
//! Builds the [`PollConfig`] used for each lifecycle transition.
//!
//! | Transition | Delay | Interval | Consecutive |
//! |---|---|---|---|
//! | Vault create/recover/update | 30s | 10s | 10 |
//! | Vault delete/purge | 0 | 10s | 1 |
//! | Nested item (all) | 0 | 5s | 3 |
//!
//! All transitions share the operation timeout (30 minutes by default).

use super::env_var_or_default;
use crate::constants::{
    DEFAULT_OPERATION_TIMEOUT_SECS, NESTED_ITEM_POLL_CONSECUTIVE_SUCCESSES,
    NESTED_ITEM_POLL_INTERVAL_SECS, VAULT_POLL_CONSECUTIVE_SUCCESSES, VAULT_POLL_DELAY_SECS,
    VAULT_POLL_INTERVAL_SECS,
};
use crate::lifecycle::PollConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingDefaults {
    pub timeout: Duration,
    pub vault_delay: Duration,
    pub vault_interval: Duration,
    pub vault_consecutive_successes: u32,
    pub nested_interval: Duration,
    pub nested_consecutive_successes: u32,
}

impl Default for PollingDefaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            vault_delay: Duration::from_secs(VAULT_POLL_DELAY_SECS),
            vault_interval: Duration::from_secs(VAULT_POLL_INTERVAL_SECS),
            vault_consecutive_successes: VAULT_POLL_CONSECUTIVE_SUCCESSES,
            nested_interval: Duration::from_secs(NESTED_ITEM_POLL_INTERVAL_SECS),
            nested_consecutive_successes: NESTED_ITEM_POLL_CONSECUTIVE_SUCCESSES,
        }
    }
}

impl PollingDefaults {
    /// Load overrides from environment variables
    ///
    /// - `KEYVAULT_POLL_TIMEOUT_SECS`: timeout for every transition
    /// - `KEYVAULT_POLL_INTERVAL_SECS`: vault probe interval
    /// - `KEYVAULT_POLL_CONSECUTIVE_SUCCESSES`: vault create/recover debounce
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: Duration::from_secs(env_var_or_default(
                "KEYVAULT_POLL_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )),
            vault_interval: Duration::from_secs(env_var_or_default(
                "KEYVAULT_POLL_INTERVAL_SECS",
                defaults.vault_interval.as_secs(),
            )),
            vault_consecutive_successes: env_var_or_default(
                "KEYVAULT_POLL_CONSECUTIVE_SUCCESSES",
                defaults.vault_consecutive_successes,
            )
            .max(1),
            ..defaults
        }
    }

    /// Waiting for a created, recovered or updated vault to become active
    #[must_use]
    pub fn vault_create(&self) -> PollConfig {
        PollConfig {
            delay: self.vault_delay,
            interval: self.vault_interval,
            timeout: self.timeout,
            required_consecutive_successes: self.vault_consecutive_successes,
        }
    }

    /// Waiting for a vault delete or purge to become observable
    #[must_use]
    pub fn vault_delete(&self) -> PollConfig {
        PollConfig {
            delay: Duration::ZERO,
            interval: self.vault_interval,
            timeout: self.timeout,
            required_consecutive_successes: 1,
        }
    }

    /// Any transition of a secret, key or certificate
    #[must_use]
    pub fn nested_item(&self) -> PollConfig {
        PollConfig {
            delay: Duration::ZERO,
            interval: self.nested_interval,
            timeout: self.timeout,
            required_consecutive_successes: self.nested_consecutive_successes,
        }
    }
}
