//! # Resource Identifiers
//!
//! Management-plane identifiers for Key Vaults and their soft-deleted
//! counterparts, nested item identifiers on the data plane, and helpers to
//! derive a vault name from its data-plane base URL.
//!
//! Parsing of ARM identifiers is case-insensitive on the segment keys
//! (`subscriptions`, `resourceGroups`, `providers`, `vaults`) since ARM does
//! not preserve their casing reliably; formatting always uses the canonical
//! casing.

use crate::error::{Error, Result};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;

const PROVIDER_NAMESPACE: &str = "Microsoft.KeyVault";

/// Management-plane identifier of a Key Vault
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyVaultId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub vault_name: String,
}

impl KeyVaultId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        vault_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            vault_name: vault_name.into(),
        }
    }

    /// Cache key for this vault: the case-folded vault name
    #[must_use]
    pub fn cache_key(&self) -> String {
        normalize_name(&self.vault_name)
    }

    /// The identifier this vault gets once soft-deleted in `location`
    #[must_use]
    pub fn deleted_id(&self, location: &str) -> DeletedVaultId {
        DeletedVaultId::new(&self.subscription_id, location, &self.vault_name)
    }
}

impl fmt::Display for KeyVaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{PROVIDER_NAMESPACE}/vaults/{}",
            self.subscription_id, self.resource_group_name, self.vault_name
        )
    }
}

impl FromStr for KeyVaultId {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let segments = split_segments(input)?;
        // subscriptions/{s}/resourceGroups/{rg}/providers/Microsoft.KeyVault/vaults/{name}
        if segments.len() != 8 {
            return Err(Error::invalid_id(
                input,
                format!("expected 8 segments, found {}", segments.len()),
            ));
        }
        expect_key(input, segments[0], "subscriptions")?;
        expect_key(input, segments[2], "resourceGroups")?;
        expect_key(input, segments[4], "providers")?;
        expect_key(input, segments[5], PROVIDER_NAMESPACE)?;
        expect_key(input, segments[6], "vaults")?;

        Ok(Self::new(segments[1], segments[3], segments[7]))
    }
}

/// Management-plane identifier of a soft-deleted Key Vault
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletedVaultId {
    pub subscription_id: String,
    pub location: String,
    pub vault_name: String,
}

impl DeletedVaultId {
    pub fn new(
        subscription_id: impl Into<String>,
        location: impl Into<String>,
        vault_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            location: normalize_location(&location.into()),
            vault_name: vault_name.into(),
        }
    }
}

impl fmt::Display for DeletedVaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/providers/{PROVIDER_NAMESPACE}/locations/{}/deletedVaults/{}",
            self.subscription_id, self.location, self.vault_name
        )
    }
}

impl FromStr for DeletedVaultId {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let segments = split_segments(input)?;
        // subscriptions/{s}/providers/Microsoft.KeyVault/locations/{l}/deletedVaults/{name}
        if segments.len() != 8 {
            return Err(Error::invalid_id(
                input,
                format!("expected 8 segments, found {}", segments.len()),
            ));
        }
        expect_key(input, segments[0], "subscriptions")?;
        expect_key(input, segments[2], "providers")?;
        expect_key(input, segments[3], PROVIDER_NAMESPACE)?;
        expect_key(input, segments[4], "locations")?;
        expect_key(input, segments[6], "deletedVaults")?;

        Ok(Self::new(segments[1], segments[5], segments[7]))
    }
}

/// Kind of item stored inside a vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestedItemKind {
    Secret,
    Key,
    Certificate,
}

impl NestedItemKind {
    /// Collection segment on the data plane, e.g. `secrets`
    #[must_use]
    pub fn collection(&self) -> &'static str {
        match self {
            NestedItemKind::Secret => "secrets",
            NestedItemKind::Key => "keys",
            NestedItemKind::Certificate => "certificates",
        }
    }

    /// Collection segment for soft-deleted items, e.g. `deletedsecrets`
    #[must_use]
    pub fn deleted_collection(&self) -> &'static str {
        match self {
            NestedItemKind::Secret => "deletedsecrets",
            NestedItemKind::Key => "deletedkeys",
            NestedItemKind::Certificate => "deletedcertificates",
        }
    }

    fn from_collection(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "secrets" => Some(NestedItemKind::Secret),
            "keys" => Some(NestedItemKind::Key),
            "certificates" => Some(NestedItemKind::Certificate),
            _ => None,
        }
    }
}

impl fmt::Display for NestedItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NestedItemKind::Secret => "Secret",
            NestedItemKind::Key => "Key",
            NestedItemKind::Certificate => "Certificate",
        };
        f.write_str(name)
    }
}

/// Data-plane identifier of a secret, key or certificate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NestedItemId {
    /// Vault base URL, always with a trailing slash
    pub vault_base_url: String,
    pub kind: NestedItemKind,
    pub name: String,
    pub version: Option<String>,
}

impl NestedItemId {
    pub fn new(vault_base_url: &str, kind: NestedItemKind, name: impl Into<String>) -> Self {
        Self {
            vault_base_url: with_trailing_slash(vault_base_url),
            kind,
            name: name.into(),
            version: None,
        }
    }

    /// Parses `https://{vault}.{suffix}/{secrets|keys|certificates}/{name}[/{version}]`
    ///
    /// # Errors
    /// Returns [`Error::InvalidId`] when the URL, collection or name is malformed
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| Error::invalid_id(input, e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_id(input, "missing host"))?;
        let vault_base_url = match url.port() {
            Some(port) => format!("{}://{host}:{port}/", url.scheme()),
            None => format!("{}://{host}/", url.scheme()),
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() != 2 && segments.len() != 3 {
            return Err(Error::invalid_id(
                input,
                "expected {collection}/{name} or {collection}/{name}/{version}",
            ));
        }
        let kind = NestedItemKind::from_collection(segments[0]).ok_or_else(|| {
            Error::invalid_id(input, format!("unknown collection {:?}", segments[0]))
        })?;

        Ok(Self {
            vault_base_url,
            kind,
            name: segments[1].to_string(),
            version: segments.get(2).map(|v| (*v).to_string()),
        })
    }
}

impl fmt::Display for NestedItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}/{}",
            self.vault_base_url,
            self.kind.collection(),
            self.name
        )?;
        if let Some(version) = &self.version {
            write!(f, "/{version}")?;
        }
        Ok(())
    }
}

/// Extracts the vault name from a data-plane base URL: the first hostname label
///
/// # Errors
/// Returns [`Error::InvalidId`] when the URL has no host or an empty first label
pub fn vault_name_from_base_url(base_url: &str) -> Result<String> {
    let url = Url::parse(base_url).map_err(|e| Error::invalid_id(base_url, e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::invalid_id(base_url, "missing host"))?;
    match host.split('.').next() {
        Some(label) if !label.is_empty() => Ok(label.to_string()),
        _ => Err(Error::invalid_id(base_url, "empty vault name")),
    }
}

/// Data-plane base URL for a vault name under a DNS suffix
#[must_use]
pub fn base_url_for_vault_name(vault_name: &str, dns_suffix: &str) -> String {
    format!("https://{vault_name}.{dns_suffix}/")
}

/// Case-folds a resource name for use as a cache key
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

/// Azure locations are compared without spaces and case, e.g. `West Europe` == `westeurope`
#[must_use]
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

pub(crate) fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

fn split_segments(input: &str) -> Result<Vec<&str>> {
    let trimmed = input.trim_matches('/');
    if trimmed.is_empty() {
        return Err(Error::invalid_id(input, "empty identifier"));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::invalid_id(input, "empty segment"));
    }
    Ok(segments)
}

fn expect_key(input: &str, actual: &str, expected: &str) -> Result<()> {
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::invalid_id(
            input,
            format!("expected segment {expected:?}, found {actual:?}"),
        ))
    }
}
