//! # Nested Item Resource
//!
//! A secret, key or certificate as a [`SoftDeletable`] resource.
//!
//! Items inherit purge protection from their vault. The vault is found through
//! the [`IdentityResolver`] from the item's base URL.

use super::types::{DeletionSchedule, ResourceState, SoftDeletable, SoftDeleteSettings};
use crate::cache::IdentityResolver;
use crate::error::{Error, Phase, Result};
use crate::provider::{NestedItemsApi, VaultsApi};
use crate::resource_id::NestedItemId;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct NestedItemResource {
    id: NestedItemId,
    subscription_id: String,
    /// Kind-specific create payload, e.g. `{"value": "..."}` for a secret
    body: serde_json::Value,
    items: Arc<dyn NestedItemsApi>,
    resolver: Arc<IdentityResolver>,
}

impl std::fmt::Debug for NestedItemResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedItemResource")
            .field("id", &self.id)
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}

impl NestedItemResource {
    pub fn new(
        id: NestedItemId,
        subscription_id: impl Into<String>,
        items: Arc<dyn NestedItemsApi>,
        resolver: Arc<IdentityResolver>,
    ) -> Self {
        Self {
            id,
            subscription_id: subscription_id.into(),
            body: serde_json::Value::Object(serde_json::Map::new()),
            items,
            resolver,
        }
    }

    /// Payload sent on create and update
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn id(&self) -> &NestedItemId {
        &self.id
    }

    fn remote(&self, phase: Phase) -> impl FnOnce(crate::provider::ApiError) -> Error + '_ {
        move |e| Error::remote(&self.id, phase, e)
    }
}

#[async_trait]
impl SoftDeletable for NestedItemResource {
    fn describe(&self) -> String {
        format!("{} {:?} in {}", self.id.kind, self.id.name, self.id.vault_base_url)
    }

    async fn state(&self) -> Result<ResourceState> {
        if self
            .items
            .get_item(&self.id)
            .await
            .map_err(self.remote(Phase::Precondition))?
            .is_some()
        {
            return Ok(ResourceState::Active);
        }
        match self
            .items
            .get_deleted_item(&self.id)
            .await
            .map_err(self.remote(Phase::Precondition))?
        {
            Some(_) => Ok(ResourceState::SoftDeleted),
            None => Ok(ResourceState::Absent),
        }
    }

    async fn soft_delete_settings(&self) -> Result<SoftDeleteSettings> {
        // An unresolvable vault may still be purge-protected
        let vault_id = self
            .resolver
            .vault_id_from_base_url(&self.subscription_id, &self.id.vault_base_url)
            .await?
            .ok_or_else(|| Error::NotFound {
                resource: format!("Key Vault at {}", self.id.vault_base_url),
                phase: Phase::Resolve,
            })?;

        let vault = self
            .resolver
            .vaults_api()
            .get_vault(&vault_id)
            .await
            .map_err(|e| Error::remote(&vault_id, Phase::Precondition, e))?;
        let Some(vault) = vault else {
            debug!("Vault {vault_id} no longer exists, purge protection does not apply");
            return Ok(SoftDeleteSettings::default());
        };
        Ok(SoftDeleteSettings {
            soft_delete_enabled: vault.properties.enable_soft_delete.unwrap_or(true),
            purge_protection_enabled: vault.properties.enable_purge_protection.unwrap_or(false),
        })
    }

    async fn create(&self) -> Result<()> {
        self.items
            .create_item(&self.id, &self.body)
            .await
            .map(|_| ())
            .map_err(self.remote(Phase::Create))
    }

    async fn update(&self) -> Result<()> {
        self.items
            .create_item(&self.id, &self.body)
            .await
            .map(|_| ())
            .map_err(self.remote(Phase::Update))
    }

    async fn recover(&self) -> Result<()> {
        self.items
            .recover_deleted_item(&self.id)
            .await
            .map_err(self.remote(Phase::Recover))
    }

    async fn delete(&self) -> Result<()> {
        self.items
            .delete_item(&self.id)
            .await
            .map_err(self.remote(Phase::Delete))
    }

    async fn purge(&self) -> Result<()> {
        self.items
            .purge_deleted_item(&self.id)
            .await
            .map_err(self.remote(Phase::Purge))
    }

    async fn deletion_schedule(&self) -> Result<Option<DeletionSchedule>> {
        let deleted = self
            .items
            .get_deleted_item(&self.id)
            .await
            .map_err(self.remote(Phase::Delete))?;
        Ok(deleted.map(|d| DeletionSchedule {
            deleted_at: d
                .deleted_date
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0)),
            scheduled_purge_at: d.scheduled_purge_time(),
        }))
    }
}
