//! Common test utilities for the integration suites
//!
//! Provides rustls setup for the Pact tests and in-memory fakes of the
//! management plane, the data plane and a scripted soft-deletable resource.

#![allow(dead_code, reason = "each test binary uses a subset of these helpers")]

use async_trait::async_trait;
use chrono::Utc;
use keyvault_lifecycle::lifecycle::{ResourceState, SoftDeletable, SoftDeleteSettings};
use keyvault_lifecycle::provider::{
    ApiError, ApiResult, CreateMode, DeletedNestedItem, DeletedVault, DeletedVaultProperties,
    GenericResource, NestedItem, NestedItemsApi, Page, Vault, VaultCreateParameters, VaultsApi,
};
use keyvault_lifecycle::resource_id::{DeletedVaultId, KeyVaultId, NestedItemId};
use keyvault_lifecycle::{Error, Phase, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::Notify;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` so it is only installed once per test binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

pub fn not_found(message: &str) -> ApiError {
    ApiError::new(Some(404), Some("NotFound".to_string()), message)
}

pub fn vault_id(name: &str) -> KeyVaultId {
    KeyVaultId::new("sub", "rg1", name)
}

/// A listing entry for `id`, as returned by the subscription resources API
pub fn listed(id: &KeyVaultId) -> GenericResource {
    GenericResource {
        id: Some(id.to_string()),
        name: Some(id.vault_name.clone()),
        resource_type: Some("Microsoft.KeyVault/vaults".to_string()),
    }
}

fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

// ============================================================================
// Management plane
// ============================================================================

#[derive(Debug, Default)]
struct VaultStore {
    live: HashMap<String, Vault>,
    deleted: HashMap<String, DeletedVault>,
    pages: Vec<Vec<GenericResource>>,
    get_errors: HashMap<String, ApiError>,
    deleted_errors: HashMap<String, ApiError>,
}

/// In-memory `VaultsApi` keyed by lower-cased vault name
#[derive(Debug, Default)]
pub struct FakeVaults {
    store: Mutex<VaultStore>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    get_delay: Mutex<Option<Duration>>,
    get_calls: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    purge_calls: AtomicUsize,
}

impl FakeVaults {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> std::sync::MutexGuard<'_, VaultStore> {
        self.store.lock().expect("fake store poisoned")
    }

    /// Add a live vault; `uri` of `None` models a response without `vaultUri`
    pub fn add_vault(&self, id: &KeyVaultId, uri: Option<&str>) {
        let mut vault = Vault {
            id: Some(id.to_string()),
            name: Some(id.vault_name.clone()),
            location: Some("westeurope".to_string()),
            ..Default::default()
        };
        vault.properties.vault_uri = uri.map(str::to_string);
        vault.properties.enable_soft_delete = Some(true);
        self.store().live.insert(id.cache_key(), vault);
    }

    pub fn set_purge_protection(&self, name: &str, enabled: bool) {
        if let Some(vault) = self.store().live.get_mut(&name.to_lowercase()) {
            vault.properties.enable_purge_protection = Some(enabled);
        }
    }

    pub fn add_soft_deleted(&self, id: &KeyVaultId, purge_protection: bool) {
        let deleted = deleted_vault(id, "westeurope", purge_protection);
        self.store().deleted.insert(id.cache_key(), deleted);
    }

    /// Pages served by `list_vaults_by_name`, linked as `page-1`, `page-2`, ...
    pub fn set_pages(&self, pages: Vec<Vec<GenericResource>>) {
        self.store().pages = pages;
    }

    pub fn fail_get(&self, name: &str, error: ApiError) {
        self.store().get_errors.insert(name.to_lowercase(), error);
    }

    pub fn fail_get_deleted(&self, name: &str, error: ApiError) {
        self.store().deleted_errors.insert(name.to_lowercase(), error);
    }

    /// Hold every `get_vault` of `name` until the returned gate is notified
    pub fn gate(&self, name: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .expect("gates poisoned")
            .insert(name.to_lowercase(), Arc::clone(&gate));
        gate
    }

    /// Make every `get_vault` take `delay`
    pub fn set_get_delay(&self, delay: Duration) {
        *self.get_delay.lock().expect("delay poisoned") = Some(delay);
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.store().live.contains_key(&name.to_lowercase())
    }

    pub fn is_soft_deleted(&self, name: &str) -> bool {
        self.store().deleted.contains_key(&name.to_lowercase())
    }

    pub fn get_calls(&self) -> usize {
        count(&self.get_calls)
    }

    pub fn list_calls(&self) -> usize {
        count(&self.list_calls)
    }

    pub fn create_calls(&self) -> usize {
        count(&self.create_calls)
    }

    pub fn delete_calls(&self) -> usize {
        count(&self.delete_calls)
    }

    pub fn purge_calls(&self) -> usize {
        count(&self.purge_calls)
    }
}

fn deleted_vault(id: &KeyVaultId, location: &str, purge_protection: bool) -> DeletedVault {
    let now = Utc::now();
    DeletedVault {
        id: Some(id.deleted_id(location).to_string()),
        name: Some(id.vault_name.clone()),
        properties: Some(DeletedVaultProperties {
            vault_id: Some(id.to_string()),
            location: Some(location.to_string()),
            deletion_date: Some(now),
            scheduled_purge_date: Some(now + chrono::Duration::days(90)),
            purge_protection_enabled: Some(purge_protection),
        }),
    }
}

#[async_trait]
impl VaultsApi for FakeVaults {
    async fn get_vault(&self, id: &KeyVaultId) -> ApiResult<Option<Vault>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let key = id.cache_key();

        let gate = self.gates.lock().expect("gates poisoned").get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let delay = *self.get_delay.lock().expect("delay poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let store = self.store();
        if let Some(error) = store.get_errors.get(&key) {
            return Err(error.clone());
        }
        Ok(store.live.get(&key).cloned())
    }

    async fn list_vaults_by_name(
        &self,
        _subscription_id: &str,
        name: &str,
        next_link: Option<&str>,
    ) -> ApiResult<Page<GenericResource>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let index = match next_link {
            None => 0,
            Some(link) => link
                .strip_prefix("page-")
                .and_then(|i| i.parse::<usize>().ok())
                .ok_or_else(|| ApiError::new(Some(400), None, format!("bad link {link}")))?,
        };

        let store = self.store();
        let value = store
            .pages
            .get(index)
            .map(|page| {
                page.iter()
                    .filter(|r| {
                        r.name
                            .as_deref()
                            .is_some_and(|n| n.eq_ignore_ascii_case(name))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let next_link = (index + 1 < store.pages.len()).then(|| format!("page-{}", index + 1));
        Ok(Page { value, next_link })
    }

    async fn get_deleted_vault(&self, id: &DeletedVaultId) -> ApiResult<Option<DeletedVault>> {
        let key = id.vault_name.to_lowercase();
        let store = self.store();
        if let Some(error) = store.deleted_errors.get(&key) {
            return Err(error.clone());
        }
        Ok(store.deleted.get(&key).cloned())
    }

    async fn create_or_update_vault(
        &self,
        id: &KeyVaultId,
        parameters: &VaultCreateParameters,
    ) -> ApiResult<Vault> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let key = id.cache_key();
        let mut store = self.store();

        if parameters.properties.create_mode == Some(CreateMode::Recover)
            && store.deleted.remove(&key).is_none()
        {
            return Err(not_found("no soft-deleted vault to recover"));
        }

        let mut properties = parameters.properties.clone();
        properties.create_mode = None;
        properties.vault_uri = Some(format!("https://{}.vault.azure.net/", id.vault_name));
        let vault = Vault {
            id: Some(id.to_string()),
            name: Some(id.vault_name.clone()),
            location: Some(parameters.location.clone()),
            properties,
            tags: parameters.tags.clone(),
        };
        store.live.insert(key, vault.clone());
        Ok(vault)
    }

    async fn delete_vault(&self, id: &KeyVaultId) -> ApiResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let key = id.cache_key();
        let mut store = self.store();
        let vault = store
            .live
            .remove(&key)
            .ok_or_else(|| not_found("vault not found"))?;

        if vault.properties.enable_soft_delete != Some(false) {
            let location = vault.location.as_deref().unwrap_or("westeurope");
            let purge_protection = vault.properties.enable_purge_protection.unwrap_or(false);
            store
                .deleted
                .insert(key, deleted_vault(id, location, purge_protection));
        }
        Ok(())
    }

    async fn purge_deleted_vault(&self, id: &DeletedVaultId) -> ApiResult<()> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        let key = id.vault_name.to_lowercase();
        let mut store = self.store();
        let protected = store
            .deleted
            .get(&key)
            .and_then(|d| d.properties.as_ref())
            .and_then(|p| p.purge_protection_enabled)
            .unwrap_or(false);
        if protected {
            return Err(ApiError::new(
                Some(409),
                Some("Conflict".to_string()),
                "purge protection is enabled",
            ));
        }
        store
            .deleted
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| not_found("deleted vault not found"))
    }
}

// ============================================================================
// Data plane
// ============================================================================

#[derive(Debug, Default)]
struct ItemStore {
    live: HashMap<String, NestedItem>,
    deleted: HashMap<String, DeletedNestedItem>,
}

/// In-memory `NestedItemsApi` keyed by item name; soft delete is always on
#[derive(Debug, Default)]
pub struct FakeItems {
    store: Mutex<ItemStore>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    recover_calls: AtomicUsize,
    purge_calls: AtomicUsize,
}

impl FakeItems {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> std::sync::MutexGuard<'_, ItemStore> {
        self.store.lock().expect("fake store poisoned")
    }

    pub fn add_item(&self, id: &NestedItemId) {
        let item = NestedItem {
            id: Some(id.to_string()),
            ..Default::default()
        };
        self.store().live.insert(id.name.clone(), item);
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.store().live.contains_key(name)
    }

    pub fn is_soft_deleted(&self, name: &str) -> bool {
        self.store().deleted.contains_key(name)
    }

    pub fn create_calls(&self) -> usize {
        count(&self.create_calls)
    }

    pub fn delete_calls(&self) -> usize {
        count(&self.delete_calls)
    }

    pub fn recover_calls(&self) -> usize {
        count(&self.recover_calls)
    }

    pub fn purge_calls(&self) -> usize {
        count(&self.purge_calls)
    }
}

#[async_trait]
impl NestedItemsApi for FakeItems {
    async fn get_item(&self, id: &NestedItemId) -> ApiResult<Option<NestedItem>> {
        Ok(self.store().live.get(&id.name).cloned())
    }

    async fn get_deleted_item(&self, id: &NestedItemId) -> ApiResult<Option<DeletedNestedItem>> {
        Ok(self.store().deleted.get(&id.name).cloned())
    }

    async fn create_item(
        &self,
        id: &NestedItemId,
        _body: &serde_json::Value,
    ) -> ApiResult<NestedItem> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let item = NestedItem {
            id: Some(id.to_string()),
            ..Default::default()
        };
        self.store().live.insert(id.name.clone(), item.clone());
        Ok(item)
    }

    async fn delete_item(&self, id: &NestedItemId) -> ApiResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut store = self.store();
        store
            .live
            .remove(&id.name)
            .ok_or_else(|| not_found("item not found"))?;
        let now = Utc::now().timestamp();
        store.deleted.insert(
            id.name.clone(),
            DeletedNestedItem {
                recovery_id: Some(id.to_string()),
                deleted_date: Some(now),
                scheduled_purge_date: Some(now + 90 * 24 * 3600),
            },
        );
        Ok(())
    }

    async fn recover_deleted_item(&self, id: &NestedItemId) -> ApiResult<()> {
        self.recover_calls.fetch_add(1, Ordering::SeqCst);
        let mut store = self.store();
        store
            .deleted
            .remove(&id.name)
            .ok_or_else(|| not_found("deleted item not found"))?;
        store.live.insert(
            id.name.clone(),
            NestedItem {
                id: Some(id.to_string()),
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn purge_deleted_item(&self, id: &NestedItemId) -> ApiResult<()> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        self.store()
            .deleted
            .remove(&id.name)
            .map(|_| ())
            .ok_or_else(|| not_found("deleted item not found"))
    }
}

// ============================================================================
// Scripted resource
// ============================================================================

/// A `SoftDeletable` whose observed states can be scripted
///
/// `state()` pops scripted states first and then reports the current state.
/// Mutations move the current state the way the real service would, unless
/// the resource is `stuck`.
#[derive(Debug)]
pub struct FakeResource {
    name: String,
    current: Mutex<ResourceState>,
    script: Mutex<VecDeque<ResourceState>>,
    settings: SoftDeleteSettings,
    stuck: bool,
    delete_error: Option<ApiError>,
    state_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    recover_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    purge_calls: AtomicUsize,
}

impl FakeResource {
    pub fn new(name: &str, state: ResourceState) -> Self {
        Self {
            name: name.to_string(),
            current: Mutex::new(state),
            script: Mutex::new(VecDeque::new()),
            settings: SoftDeleteSettings::default(),
            stuck: false,
            delete_error: None,
            state_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            recover_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            purge_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_settings(mut self, settings: SoftDeleteSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_purge_protection(self) -> Self {
        self.with_settings(SoftDeleteSettings {
            soft_delete_enabled: true,
            purge_protection_enabled: true,
        })
    }

    pub fn with_script(self, states: impl IntoIterator<Item = ResourceState>) -> Self {
        self.script.lock().expect("script poisoned").extend(states);
        self
    }

    /// Mutations are accepted but never become observable
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    pub fn with_delete_error(mut self, error: ApiError) -> Self {
        self.delete_error = Some(error);
        self
    }

    fn transition(&self, to: ResourceState) {
        if !self.stuck {
            *self.current.lock().expect("state poisoned") = to;
        }
    }

    pub fn current(&self) -> ResourceState {
        *self.current.lock().expect("state poisoned")
    }

    pub fn state_calls(&self) -> usize {
        count(&self.state_calls)
    }

    pub fn create_calls(&self) -> usize {
        count(&self.create_calls)
    }

    pub fn update_calls(&self) -> usize {
        count(&self.update_calls)
    }

    pub fn recover_calls(&self) -> usize {
        count(&self.recover_calls)
    }

    pub fn delete_calls(&self) -> usize {
        count(&self.delete_calls)
    }

    pub fn purge_calls(&self) -> usize {
        count(&self.purge_calls)
    }

    /// Every call that changes the remote resource
    pub fn mutations(&self) -> usize {
        self.create_calls()
            + self.update_calls()
            + self.recover_calls()
            + self.delete_calls()
            + self.purge_calls()
    }
}

#[async_trait]
impl SoftDeletable for FakeResource {
    fn describe(&self) -> String {
        format!("fake resource {:?}", self.name)
    }

    async fn state(&self) -> Result<ResourceState> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().expect("script poisoned").pop_front();
        Ok(scripted.unwrap_or_else(|| self.current()))
    }

    async fn soft_delete_settings(&self) -> Result<SoftDeleteSettings> {
        Ok(self.settings)
    }

    async fn create(&self) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.transition(ResourceState::Active);
        Ok(())
    }

    async fn update(&self) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn recover(&self) -> Result<()> {
        self.recover_calls.fetch_add(1, Ordering::SeqCst);
        self.transition(ResourceState::Active);
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.settings.soft_delete_enabled {
            self.transition(ResourceState::SoftDeleted);
        } else {
            self.transition(ResourceState::Absent);
        }
        match &self.delete_error {
            Some(source) => Err(Error::Remote {
                resource: self.describe(),
                phase: Phase::Delete,
                source: source.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn purge(&self) -> Result<()> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        self.transition(ResourceState::Absent);
        Ok(())
    }
}
