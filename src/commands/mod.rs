//! # Commands
//!
//! Implementations of the `kvctl` subcommands.

use anyhow::{Context as _, Result};
use keyvault_lifecycle::cache::IdentityResolver;
use keyvault_lifecycle::config::{AzureConfig, FeaturesConfig, PollingDefaults};
use keyvault_lifecycle::provider::azure::{ArmVaultsClient, DataPlaneClient};
use keyvault_lifecycle::resource_id::KeyVaultId;
use std::sync::Arc;

pub mod item;
pub mod resolve;
pub mod vault;

/// Shared state for a single command invocation
#[derive(Debug)]
pub struct Context {
    pub config: AzureConfig,
    pub features: FeaturesConfig,
    pub polling: PollingDefaults,
    pub resolver: Arc<IdentityResolver>,
}

impl Context {
    pub fn from_env() -> Result<Self> {
        let config = AzureConfig::from_env()?;
        let vaults = ArmVaultsClient::new(&config).context("Failed to create ARM client")?;
        Ok(Self {
            features: FeaturesConfig::from_env(),
            polling: PollingDefaults::from_env(),
            resolver: Arc::new(IdentityResolver::new(Arc::new(vaults))),
            config,
        })
    }

    pub fn data_plane(&self) -> Result<DataPlaneClient> {
        DataPlaneClient::new(&self.config).context("Failed to create Key Vault data-plane client")
    }
}

pub(crate) fn parse_vault_id(vault_id: &str) -> Result<KeyVaultId> {
    vault_id
        .parse()
        .with_context(|| format!("Invalid Key Vault ID {vault_id:?}"))
}
