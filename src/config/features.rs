//! # Feature Switches
//!
//! Soft-delete behaviour toggles. Recovery and purge are opt-out: both default
//! to enabled, matching the provider's historical `features` block defaults.

use super::env_var_or_default_bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeaturesConfig {
    /// Recover a soft-deleted vault of the same name instead of failing create
    pub recover_soft_deleted_vaults: bool,
    /// Purge a vault after deleting it (unless purge protection is enabled)
    pub purge_soft_delete_on_destroy: bool,
    /// Recover soft-deleted secrets, keys and certificates on create
    pub recover_soft_deleted_items: bool,
    /// Purge secrets, keys and certificates after deleting them
    pub purge_soft_deleted_items_on_destroy: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            recover_soft_deleted_vaults: true,
            purge_soft_delete_on_destroy: true,
            recover_soft_deleted_items: true,
            purge_soft_deleted_items_on_destroy: true,
        }
    }
}

impl FeaturesConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            recover_soft_deleted_vaults: env_var_or_default_bool(
                "KEYVAULT_RECOVER_SOFT_DELETED_VAULTS",
                defaults.recover_soft_deleted_vaults,
            ),
            purge_soft_delete_on_destroy: env_var_or_default_bool(
                "KEYVAULT_PURGE_SOFT_DELETE_ON_DESTROY",
                defaults.purge_soft_delete_on_destroy,
            ),
            recover_soft_deleted_items: env_var_or_default_bool(
                "KEYVAULT_RECOVER_SOFT_DELETED_ITEMS",
                defaults.recover_soft_deleted_items,
            ),
            purge_soft_deleted_items_on_destroy: env_var_or_default_bool(
                "KEYVAULT_PURGE_SOFT_DELETED_ITEMS_ON_DESTROY",
                defaults.purge_soft_deleted_items_on_destroy,
            ),
        }
    }
}
