//! # ARM Vaults Client
//!
//! REST client for the `Microsoft.KeyVault/vaults` management plane.
//!
//! References:
//! - [Vaults REST API](https://learn.microsoft.com/rest/api/keyvault/keyvault/vaults)
//! - [Resources - List](https://learn.microsoft.com/rest/api/resources/resources/list)

use super::auth::credential;
use super::http::{api_url, RestClient};
use crate::config::AzureConfig;
use crate::constants::{
    KEYVAULT_RESOURCE_TYPE, MANAGEMENT_SCOPE, RESOURCES_API_VERSION, VAULTS_API_VERSION,
};
use crate::provider::{
    ApiError, ApiResult, DeletedVault, GenericResource, Page, Vault, VaultCreateParameters,
    VaultsApi,
};
use crate::resource_id::{DeletedVaultId, KeyVaultId};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Method, Url};
use tracing::{debug_span, info, info_span, Instrument};

pub struct ArmVaultsClient {
    rest: RestClient,
    endpoint: String,
}

impl std::fmt::Debug for ArmVaultsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmVaultsClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ArmVaultsClient {
    /// Create a management-plane client for `config.management_endpoint`
    ///
    /// # Errors
    /// Returns an error if the credential or HTTP client cannot be created
    pub fn new(config: &AzureConfig) -> Result<Self> {
        if config.pact_mode {
            info!(
                "Pact mode enabled: routing ARM requests to {}",
                config.management_endpoint
            );
        }
        Ok(Self {
            rest: RestClient::new(credential(config)?, MANAGEMENT_SCOPE)?,
            endpoint: config.management_endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: impl std::fmt::Display, api_version: &str) -> ApiResult<Url> {
        api_url(&format!("{}{path}", self.endpoint), api_version)
    }
}

#[async_trait]
impl VaultsApi for ArmVaultsClient {
    async fn get_vault(&self, id: &KeyVaultId) -> ApiResult<Option<Vault>> {
        let span = debug_span!("azure.arm.vaults.get", vault.name = %id.vault_name);
        let url = self.url(id, VAULTS_API_VERSION)?;
        self.rest.get_json(url).instrument(span).await
    }

    async fn list_vaults_by_name(
        &self,
        subscription_id: &str,
        name: &str,
        next_link: Option<&str>,
    ) -> ApiResult<Page<GenericResource>> {
        let span = debug_span!("azure.arm.resources.list", vault.name = name);
        let url = match next_link {
            Some(link) => Url::parse(link).map_err(|e| {
                ApiError::transport(format!("Invalid nextLink {link:?}: {e}"))
            })?,
            None => {
                let mut url = self.url(
                    format_args!("/subscriptions/{subscription_id}/resources"),
                    RESOURCES_API_VERSION,
                )?;
                url.query_pairs_mut().append_pair(
                    "$filter",
                    &format!("resourceType eq '{KEYVAULT_RESOURCE_TYPE}' and name eq '{name}'"),
                );
                url
            }
        };
        let page = self.rest.get_json(url).instrument(span).await?;
        Ok(page.unwrap_or_default())
    }

    async fn get_deleted_vault(&self, id: &DeletedVaultId) -> ApiResult<Option<DeletedVault>> {
        let span = debug_span!("azure.arm.deleted_vaults.get", vault.name = %id.vault_name);
        let url = self.url(id, VAULTS_API_VERSION)?;
        self.rest.get_json(url).instrument(span).await
    }

    async fn create_or_update_vault(
        &self,
        id: &KeyVaultId,
        parameters: &VaultCreateParameters,
    ) -> ApiResult<Vault> {
        let span = info_span!(
            "azure.arm.vaults.create_or_update",
            vault.name = %id.vault_name,
            create_mode = ?parameters.properties.create_mode,
        );
        let url = self.url(id, VAULTS_API_VERSION)?;
        let body = serde_json::to_value(parameters).map_err(|e| {
            ApiError::transport(format!("Failed to serialize vault parameters: {e}"))
        })?;
        self.rest
            .send_json(Method::PUT, url, Some(&body))
            .instrument(span)
            .await
    }

    async fn delete_vault(&self, id: &KeyVaultId) -> ApiResult<()> {
        let span = info_span!("azure.arm.vaults.delete", vault.name = %id.vault_name);
        let url = self.url(id, VAULTS_API_VERSION)?;
        self.rest
            .send_empty(Method::DELETE, url, None)
            .instrument(span)
            .await
    }

    async fn purge_deleted_vault(&self, id: &DeletedVaultId) -> ApiResult<()> {
        let span = info_span!("azure.arm.deleted_vaults.purge", vault.name = %id.vault_name);
        let url = self.url(format_args!("{id}/purge"), VAULTS_API_VERSION)?;
        self.rest
            .send_empty(Method::POST, url, None)
            .instrument(span)
            .await
    }
}
