//! # Constants
//!
//! Shared constants used throughout the crate.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default Azure Resource Manager endpoint (public cloud)
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Default DNS suffix for Key Vault data-plane endpoints (public cloud)
pub const DEFAULT_KEYVAULT_DNS_SUFFIX: &str = "vault.azure.net";

/// OAuth scope for the management plane
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// OAuth scope for the Key Vault data plane
pub const KEYVAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// API version for `Microsoft.KeyVault/vaults` and `deletedVaults`
pub const VAULTS_API_VERSION: &str = "2023-07-01";

/// API version for the generic subscription resources list
pub const RESOURCES_API_VERSION: &str = "2022-09-01";

/// API version for the Key Vault data plane
pub const KEYVAULT_DATA_PLANE_API_VERSION: &str = "7.4";

/// ARM resource type of a Key Vault
pub const KEYVAULT_RESOURCE_TYPE: &str = "Microsoft.KeyVault/vaults";

/// Default create/update/delete timeout (seconds) - 30 minutes
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30 * 60;

/// Delay before the first probe after a vault is created or recovered (seconds)
pub const VAULT_POLL_DELAY_SECS: u64 = 30;

/// Interval between vault availability probes (seconds)
pub const VAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Consecutive successful probes required before a vault is considered available
pub const VAULT_POLL_CONSECUTIVE_SUCCESSES: u32 = 10;

/// Interval between nested item delete/purge probes (seconds)
pub const NESTED_ITEM_POLL_INTERVAL_SECS: u64 = 5;

/// Consecutive probes required before a nested item delete/purge is considered done
pub const NESTED_ITEM_POLL_CONSECUTIVE_SUCCESSES: u32 = 3;

/// Default soft-delete retention in days applied by Azure when unset
pub const DEFAULT_SOFT_DELETE_RETENTION_DAYS: u32 = 90;
