//! # API Models
//!
//! Request/response payloads for the Key Vault management plane
//! (`Microsoft.KeyVault/vaults`) and data plane (secrets, keys, certificates).
//!
//! Only the fields this crate reads or writes are modelled; unknown fields are
//! ignored on deserialization.
//!
//! References:
//! - [Vaults REST API](https://learn.microsoft.com/rest/api/keyvault/keyvault/vaults)
//! - [Key Vault data plane REST API](https://learn.microsoft.com/rest/api/keyvault/)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Management plane
// ============================================================================

/// A live Key Vault
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: VaultProperties,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultProperties {
    /// Data-plane base URI, e.g. `https://kv1.vault.azure.net/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_soft_delete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_purge_protection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete_retention_in_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_mode: Option<CreateMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_network_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_policies: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    pub family: String,
    pub name: SkuName,
}

impl Sku {
    #[must_use]
    pub fn new(name: SkuName) -> Self {
        Self {
            family: "A".to_string(),
            name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkuName {
    Standard,
    Premium,
}

/// Whether a create call provisions a new vault or recovers a soft-deleted one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateMode {
    Default,
    Recover,
}

/// Body of `PUT .../vaults/{name}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultCreateParameters {
    pub location: String,
    pub properties: VaultProperties,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

/// A soft-deleted Key Vault
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedVault {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Option<DeletedVaultProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedVaultProperties {
    /// Management identifier of the vault before deletion
    #[serde(default)]
    pub vault_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub deletion_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_purge_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub purge_protection_enabled: Option<bool>,
}

impl DeletedVault {
    /// A deleted-vault lookup can return a live vault with empty deletion
    /// properties; only an entry with both dates set is actually soft-deleted.
    #[must_use]
    pub fn is_soft_deleted(&self) -> bool {
        self.properties.as_ref().is_some_and(|p| {
            p.deletion_date.is_some() && p.scheduled_purge_date.is_some()
        })
    }
}

/// Entry of the generic subscription resources list
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericResource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
}

/// One page of a list response
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            next_link: None,
        }
    }
}

// ============================================================================
// Data plane
// ============================================================================

/// A live secret, key or certificate
///
/// Keys report their identifier under `key.kid` rather than `id`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Option<JsonWebKey>,
    #[serde(default)]
    pub attributes: Option<ItemAttributes>,
}

impl NestedItem {
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.key.as_ref().and_then(|k| k.kid.as_deref()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JsonWebKey {
    #[serde(default)]
    pub kid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAttributes {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub recovery_level: Option<String>,
}

/// A soft-deleted secret, key or certificate
///
/// Dates on the data plane are Unix timestamps in seconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedNestedItem {
    #[serde(default)]
    pub recovery_id: Option<String>,
    #[serde(default)]
    pub deleted_date: Option<i64>,
    #[serde(default)]
    pub scheduled_purge_date: Option<i64>,
}

impl DeletedNestedItem {
    #[must_use]
    pub fn scheduled_purge_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled_purge_date
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}
