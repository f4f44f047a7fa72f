//! # Vault Resource
//!
//! A Key Vault as a [`SoftDeletable`] resource.
//!
//! The vault's data-plane URI is registered with the [`IdentityResolver`]
//! whenever a create, recover or update returns it, and the cached entry is
//! dropped after delete and purge so a later create of the same name is not
//! answered from a stale entry.
//!
//! Transitions of one vault hold the resolver's lock for the vault's name.

use super::types::{DeletionSchedule, ResourceState, SoftDeletable, SoftDeleteSettings};
use crate::cache::IdentityResolver;
use crate::error::{Error, Phase, Result};
use crate::provider::{
    CreateMode, DeletedVault, Vault, VaultCreateParameters, VaultProperties, VaultsApi,
};
use crate::resource_id::{DeletedVaultId, KeyVaultId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info_span, Instrument};

pub struct VaultResource {
    id: KeyVaultId,
    parameters: VaultCreateParameters,
    vaults: Arc<dyn VaultsApi>,
    resolver: Arc<IdentityResolver>,
}

impl std::fmt::Debug for VaultResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultResource")
            .field("id", &self.id)
            .field("location", &self.parameters.location)
            .finish_non_exhaustive()
    }
}

impl VaultResource {
    /// `parameters` describes the desired vault; its `create_mode` is set per call
    pub fn new(
        id: KeyVaultId,
        parameters: VaultCreateParameters,
        resolver: Arc<IdentityResolver>,
    ) -> Self {
        Self {
            id,
            parameters,
            vaults: resolver.vaults_api(),
            resolver,
        }
    }

    /// A vault that is only going to be deleted or purged
    pub fn existing(
        id: KeyVaultId,
        location: impl Into<String>,
        resolver: Arc<IdentityResolver>,
    ) -> Self {
        let parameters = VaultCreateParameters {
            location: location.into(),
            properties: VaultProperties::default(),
            tags: HashMap::new(),
        };
        Self::new(id, parameters, resolver)
    }

    #[must_use]
    pub fn id(&self) -> &KeyVaultId {
        &self.id
    }

    #[must_use]
    pub fn deleted_id(&self) -> DeletedVaultId {
        self.id.deleted_id(&self.parameters.location)
    }

    async fn live_vault(&self, phase: Phase) -> Result<Option<Vault>> {
        self.vaults
            .get_vault(&self.id)
            .await
            .map_err(|e| Error::remote(&self.id, phase, e))
    }

    /// The soft-deleted copy, if any
    ///
    /// A 403 is treated as "none": the caller may lack permission on the
    /// subscription-wide deleted vaults listing.
    async fn deleted_vault(&self, phase: Phase) -> Result<Option<DeletedVault>> {
        let deleted_id = self.deleted_id();
        match self.vaults.get_deleted_vault(&deleted_id).await {
            Ok(Some(deleted)) if deleted.is_soft_deleted() => Ok(Some(deleted)),
            Ok(_) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) if e.is_forbidden() => {
                debug!("No permission to read {deleted_id}, assuming it is not soft-deleted: {e}");
                Ok(None)
            }
            Err(e) => Err(Error::remote(&deleted_id, phase, e)),
        }
    }

    async fn put(&self, phase: Phase, create_mode: Option<CreateMode>) -> Result<()> {
        let mut parameters = self.parameters.clone();
        parameters.properties.create_mode = create_mode;
        let span = info_span!(
            "keyvault.vault.put",
            vault.name = %self.id.vault_name,
            phase = %phase,
        );

        let vault = self
            .vaults
            .create_or_update_vault(&self.id, &parameters)
            .instrument(span)
            .await
            .map_err(|e| Error::remote(&self.id, phase, e))?;

        if let Some(uri) = vault.properties.vault_uri.as_deref() {
            self.resolver.register(&self.id, uri);
        }
        Ok(())
    }
}

#[async_trait]
impl SoftDeletable for VaultResource {
    fn describe(&self) -> String {
        format!("Key Vault {}", self.id)
    }

    async fn state(&self) -> Result<ResourceState> {
        if self.live_vault(Phase::Precondition).await?.is_some() {
            return Ok(ResourceState::Active);
        }
        match self.deleted_vault(Phase::Precondition).await? {
            Some(_) => Ok(ResourceState::SoftDeleted),
            None => Ok(ResourceState::Absent),
        }
    }

    async fn soft_delete_settings(&self) -> Result<SoftDeleteSettings> {
        if let Some(vault) = self.live_vault(Phase::Precondition).await? {
            return Ok(SoftDeleteSettings {
                soft_delete_enabled: vault.properties.enable_soft_delete.unwrap_or(true),
                purge_protection_enabled: vault
                    .properties
                    .enable_purge_protection
                    .unwrap_or(false),
            });
        }
        let purge_protection_enabled = self
            .deleted_vault(Phase::Precondition)
            .await?
            .and_then(|d| d.properties)
            .and_then(|p| p.purge_protection_enabled)
            .unwrap_or(false);
        Ok(SoftDeleteSettings {
            soft_delete_enabled: true,
            purge_protection_enabled,
        })
    }

    async fn create(&self) -> Result<()> {
        self.put(Phase::Create, Some(CreateMode::Default)).await
    }

    async fn update(&self) -> Result<()> {
        self.put(Phase::Update, None).await
    }

    async fn recover(&self) -> Result<()> {
        self.put(Phase::Recover, Some(CreateMode::Recover)).await
    }

    async fn delete(&self) -> Result<()> {
        let result = self
            .vaults
            .delete_vault(&self.id)
            .await
            .map_err(|e| Error::remote(&self.id, Phase::Delete, e));
        self.resolver.invalidate(&self.id.vault_name);
        result
    }

    async fn purge(&self) -> Result<()> {
        let deleted_id = self.deleted_id();
        let result = self
            .vaults
            .purge_deleted_vault(&deleted_id)
            .await
            .map_err(|e| Error::remote(&deleted_id, Phase::Purge, e));
        self.resolver.invalidate(&self.id.vault_name);
        result
    }

    async fn deletion_schedule(&self) -> Result<Option<DeletionSchedule>> {
        Ok(self
            .deleted_vault(Phase::Delete)
            .await?
            .and_then(|d| d.properties)
            .map(|p| DeletionSchedule {
                deleted_at: p.deletion_date,
                scheduled_purge_at: p.scheduled_purge_date,
            }))
    }

    async fn lock(&self) -> Option<OwnedMutexGuard<()>> {
        Some(self.resolver.lock_name(&self.id.vault_name).await)
    }
}
