//! # Provider Modules
//!
//! The remote APIs the resolver and the lifecycle reconciler depend on.
//!
//! Each backend implements either:
//! - `VaultsApi` for the management plane (`Microsoft.KeyVault/vaults`)
//! - `NestedItemsApi` for the data plane (secrets, keys, certificates)
//!
//! Not-found is part of the contract: lookups return `Ok(None)`, mutating calls
//! return an [`ApiError`] whose [`ApiError::is_not_found`] is true.

use crate::resource_id::{DeletedVaultId, KeyVaultId, NestedItemId};
use async_trait::async_trait;
use thiserror::Error;

pub mod azure;
pub mod models;

pub use models::{
    CreateMode, DeletedNestedItem, DeletedVault, DeletedVaultProperties, GenericResource,
    NestedItem, Page, Sku, SkuName, Vault, VaultCreateParameters, VaultProperties,
};

/// Failure reported by a remote API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", describe(.status, .code, .message))]
pub struct ApiError {
    /// HTTP status code, if the request reached the service
    pub status: Option<u16>,
    /// Service error code, e.g. `VaultNotFound`
    pub code: Option<String>,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Option<u16>, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Error that never reached the service (connection, timeout, decoding)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, None, message)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.status == Some(403)
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status == Some(409)
    }
}

fn describe(status: &Option<u16>, code: &Option<String>, message: &str) -> String {
    match (status, code) {
        (Some(status), Some(code)) => format!("HTTP {status} ({code}): {message}"),
        (Some(status), None) => format!("HTTP {status}: {message}"),
        (None, _) => message.to_string(),
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Management-plane operations on Key Vaults
#[async_trait]
pub trait VaultsApi: Send + Sync {
    /// Get a live vault; `Ok(None)` when it does not exist
    async fn get_vault(&self, id: &KeyVaultId) -> ApiResult<Option<Vault>>;

    /// List vault resources in a subscription whose name matches `name`
    ///
    /// Pass the previous page's `next_link` to fetch the following page.
    async fn list_vaults_by_name(
        &self,
        subscription_id: &str,
        name: &str,
        next_link: Option<&str>,
    ) -> ApiResult<Page<GenericResource>>;

    /// Get a soft-deleted vault; `Ok(None)` when there is none
    async fn get_deleted_vault(&self, id: &DeletedVaultId) -> ApiResult<Option<DeletedVault>>;

    /// Create, update or recover a vault depending on `properties.create_mode`
    async fn create_or_update_vault(
        &self,
        id: &KeyVaultId,
        parameters: &VaultCreateParameters,
    ) -> ApiResult<Vault>;

    async fn delete_vault(&self, id: &KeyVaultId) -> ApiResult<()>;

    async fn purge_deleted_vault(&self, id: &DeletedVaultId) -> ApiResult<()>;
}

/// Data-plane operations on secrets, keys and certificates
///
/// The item version in [`NestedItemId`] is ignored; calls address the latest version.
#[async_trait]
pub trait NestedItemsApi: Send + Sync {
    async fn get_item(&self, id: &NestedItemId) -> ApiResult<Option<NestedItem>>;

    async fn get_deleted_item(&self, id: &NestedItemId) -> ApiResult<Option<DeletedNestedItem>>;

    /// Create (or add a new version of) an item from a kind-specific JSON body
    async fn create_item(&self, id: &NestedItemId, body: &serde_json::Value)
        -> ApiResult<NestedItem>;

    async fn delete_item(&self, id: &NestedItemId) -> ApiResult<()>;

    async fn recover_deleted_item(&self, id: &NestedItemId) -> ApiResult<()>;

    async fn purge_deleted_item(&self, id: &NestedItemId) -> ApiResult<()>;
}
