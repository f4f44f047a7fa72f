//! # Configuration
//!
//! Settings loaded from environment variables, with defaults from
//! [`crate::constants`].
//!
//! - `azure`: endpoints, subscription and authentication
//! - `features`: soft-delete recovery and purge-on-destroy switches
//! - `polling`: default poll settings for each lifecycle transition

pub mod azure;
pub mod features;
pub mod polling;

pub use azure::{AzureAuth, AzureConfig};
pub use features::FeaturesConfig;
pub use polling::PollingDefaults;

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
pub(crate) fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |v| parse_bool(&v))
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    let v_lower = value.to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}
