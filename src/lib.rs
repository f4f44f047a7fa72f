//! # Key Vault Lifecycle
//!
//! Identity resolution and soft-delete-aware lifecycle management for Azure
//! Key Vaults and the secrets, keys and certificates they hold.
//!
//! ## Components
//!
//! - [`cache::IdentityResolver`] resolves a vault's management identifier to its
//!   data-plane base URI and back, caching results for the life of the
//!   resolver. Concurrent lookups of the same vault name share one remote call;
//!   lookups of different names never wait on each other.
//! - [`lifecycle::LifecycleReconciler`] drives create-or-recover and
//!   delete-or-purge of any [`lifecycle::SoftDeletable`] resource and polls
//!   until each transition is observable.
//! - [`provider::azure`] implements the remote APIs against Azure REST
//!   endpoints.
//!
//! ## Example
//!
//! ```no_run
//! use keyvault_lifecycle::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AzureConfig::from_env()?;
//! let resolver = Arc::new(IdentityResolver::new(Arc::new(ArmVaultsClient::new(&config)?)));
//!
//! let id: KeyVaultId = "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/kv1".parse()?;
//! let base_uri = resolver.base_uri_for_vault(&id).await?;
//! println!("{base_uri}");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod resource_id;

pub use error::{Error, Phase, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::cache::IdentityResolver;
    pub use crate::config::{AzureConfig, FeaturesConfig, PollingDefaults};
    pub use crate::error::{Error, Phase};
    pub use crate::lifecycle::{
        Action, LifecycleReconciler, LifecycleRequest, NestedItemResource, PollConfig,
        ResourceState, SoftDeletable, VaultResource,
    };
    pub use crate::provider::azure::{ArmVaultsClient, DataPlaneClient};
    pub use crate::provider::{NestedItemsApi, VaultsApi};
    pub use crate::resource_id::{KeyVaultId, NestedItemId, NestedItemKind};
}
