//! # Identity Resolver
//!
//! Resolves between a vault's management identifier and its data-plane base
//! URI, caching every successful lookup for the life of the resolver.
//!
//! ## Locking
//!
//! Each resolution holds the [`NamedLocks`] entry for the case-folded vault
//! name for its whole duration, so concurrent resolutions of the same name make
//! a single remote call and the waiters read the cached result. The lock map and
//! the entry map are each behind their own short-lived lock; neither is held
//! across a remote call, so different names never wait on each other.
//!
//! Failed lookups leave no entry behind.

use super::named_lock::NamedLocks;
use crate::error::{Error, Phase, Result};
use crate::observability::metrics;
use crate::provider::VaultsApi;
use crate::resource_id::{
    normalize_name, vault_name_from_base_url, with_trailing_slash, KeyVaultId,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, field, info_span, Instrument};

/// A resolved vault: both of its identities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Case-folded vault name
    pub key: String,
    pub vault_id: KeyVaultId,
    /// Data-plane base URI, with trailing slash
    pub base_uri: String,
}

pub struct IdentityResolver {
    vaults: Arc<dyn VaultsApi>,
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
    locks: NamedLocks,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("entries", &self.len())
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl IdentityResolver {
    pub fn new(vaults: Arc<dyn VaultsApi>) -> Self {
        Self {
            vaults,
            entries: RwLock::new(HashMap::new()),
            locks: NamedLocks::new(),
        }
    }

    /// The management-plane API this resolver looks vaults up with
    #[must_use]
    pub fn vaults_api(&self) -> Arc<dyn VaultsApi> {
        Arc::clone(&self.vaults)
    }

    /// Take the per-name lock that resolutions of `vault_name` also hold
    ///
    /// Callers use it to serialize create and delete of one vault. While the
    /// guard is held, resolving the same name from this task deadlocks;
    /// [`Self::register`] and [`Self::invalidate`] take no lock and are safe.
    pub async fn lock_name(&self, vault_name: &str) -> OwnedMutexGuard<()> {
        self.locks.get(&normalize_name(vault_name)).lock_owned().await
    }

    /// Data-plane base URI of the vault `id`
    ///
    /// # Errors
    /// - [`Error::NotFound`] when the vault does not exist
    /// - [`Error::MalformedResponse`] when the vault has no `vaultUri`
    /// - [`Error::Remote`] for any other failure of the lookup
    pub async fn base_uri_for_vault(&self, id: &KeyVaultId) -> Result<String> {
        let key = id.cache_key();
        let span = info_span!(
            "keyvault.resolver.base_uri_for_vault",
            vault.name = %id.vault_name,
            cache.hit = field::Empty,
        );
        let span_clone = span.clone();

        async move {
            let lock = self.locks.get(&key);
            let _guard = lock.lock().await;

            if let Some(entry) = self.entry(&key) {
                span_clone.record("cache.hit", true);
                metrics::increment_cache_hits();
                return Ok(entry.base_uri.clone());
            }
            span_clone.record("cache.hit", false);
            metrics::increment_cache_misses();

            let base_uri = self.lookup_base_uri(id).await?;
            self.insert(id.clone(), &base_uri);
            Ok(base_uri)
        }
        .instrument(span)
        .await
    }

    /// Management identifier of the vault serving `base_url`
    ///
    /// Returns `Ok(None)` when no vault in `subscription_id` has that name.
    /// Without a cached entry this scans every page of the subscription's
    /// vault listing until a name matches.
    ///
    /// # Errors
    /// - [`Error::InvalidId`] when no vault name can be read from `base_url`
    /// - [`Error::Remote`] when listing or fetching the matched vault fails
    pub async fn vault_id_from_base_url(
        &self,
        subscription_id: &str,
        base_url: &str,
    ) -> Result<Option<KeyVaultId>> {
        let vault_name = vault_name_from_base_url(base_url)?;
        let key = normalize_name(&vault_name);
        let span = info_span!(
            "keyvault.resolver.vault_id_from_base_url",
            vault.name = %vault_name,
            cache.hit = field::Empty,
            pages.scanned = field::Empty,
        );
        let span_clone = span.clone();

        async move {
            let lock = self.locks.get(&key);
            let _guard = lock.lock().await;

            if let Some(entry) = self.entry(&key) {
                span_clone.record("cache.hit", true);
                metrics::increment_cache_hits();
                return Ok(Some(entry.vault_id.clone()));
            }
            span_clone.record("cache.hit", false);
            metrics::increment_cache_misses();

            let mut next_link: Option<String> = None;
            let mut pages = 0_u32;
            loop {
                metrics::increment_remote_lookups("list");
                let page = self
                    .vaults
                    .list_vaults_by_name(subscription_id, &vault_name, next_link.as_deref())
                    .await
                    .map_err(|e| Error::remote(base_url, Phase::Resolve, e))?;
                pages += 1;
                debug!(
                    page = pages,
                    candidates = page.value.len(),
                    "Scanned vault listing for {vault_name}"
                );

                for resource in &page.value {
                    let Some(name) = resource.name.as_deref() else {
                        continue;
                    };
                    if normalize_name(name) != key {
                        continue;
                    }
                    let Some(resource_id) = resource.id.as_deref() else {
                        continue;
                    };
                    let id: KeyVaultId = resource_id.parse()?;
                    span_clone.record("pages.scanned", pages);

                    let base_uri = self.lookup_base_uri(&id).await?;
                    self.insert(id.clone(), &base_uri);
                    return Ok(Some(id));
                }

                match page.next_link {
                    Some(link) if !link.is_empty() => next_link = Some(link),
                    _ => {
                        span_clone.record("pages.scanned", pages);
                        debug!("No vault named {vault_name} found after {pages} page(s)");
                        return Ok(None);
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Whether the vault `id` exists, answered from the cache when possible
    ///
    /// # Errors
    /// Returns [`Error::Remote`] when the lookup fails for a reason other than not-found
    pub async fn exists(&self, id: &KeyVaultId) -> Result<bool> {
        let key = id.cache_key();
        let lock = self.locks.get(&key);
        let _guard = lock.lock().await;

        if self.entry(&key).is_some() {
            metrics::increment_cache_hits();
            return Ok(true);
        }
        metrics::increment_cache_misses();

        match self.lookup_base_uri(id).await {
            Ok(base_uri) => {
                self.insert(id.clone(), &base_uri);
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            // A vault without a URI still exists; it just cannot be cached
            Err(Error::MalformedResponse { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Warm the cache after a vault was created or recovered
    pub fn register(&self, id: &KeyVaultId, base_uri: &str) {
        debug!(vault.name = %id.vault_name, "Registering {base_uri} in resolver cache");
        self.insert(id.clone(), base_uri);
    }

    /// Drop the cached entry for a vault name, e.g. after delete or purge
    ///
    /// Does not wait for in-flight resolutions of the same name.
    pub fn invalidate(&self, vault_name: &str) {
        let key = normalize_name(vault_name);
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        if removed.is_some() {
            debug!(vault.name = vault_name, "Invalidated resolver cache entry");
        }
    }

    /// Cached base URI for a vault name, without any remote call
    #[must_use]
    pub fn cached_base_uri(&self, vault_name: &str) -> Option<String> {
        self.entry(&normalize_name(vault_name))
            .map(|entry| entry.base_uri.clone())
    }

    #[must_use]
    pub fn cached_entry(&self, vault_name: &str) -> Option<Arc<CacheEntry>> {
        self.entry(&normalize_name(vault_name))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn lookup_base_uri(&self, id: &KeyVaultId) -> Result<String> {
        metrics::increment_remote_lookups("get");
        let vault = self
            .vaults
            .get_vault(id)
            .await
            .map_err(|e| Error::remote(id, Phase::Resolve, e))?
            .ok_or_else(|| Error::NotFound {
                resource: id.to_string(),
                phase: Phase::Resolve,
            })?;

        match vault.properties.vault_uri {
            Some(uri) if !uri.is_empty() => Ok(with_trailing_slash(&uri)),
            _ => Err(Error::MalformedResponse {
                resource: id.to_string(),
                field: "properties.vaultUri",
            }),
        }
    }

    fn entry(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(Arc::clone)
    }

    fn insert(&self, vault_id: KeyVaultId, base_uri: &str) {
        let key = vault_id.cache_key();
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            vault_id,
            base_uri: with_trailing_slash(base_uri),
        });
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }
}
