//! # Key Vault Data Plane Client
//!
//! REST client for secrets, keys and certificates, plus the vault
//! availability probe used after a vault is created.
//!
//! Items are addressed at their vault's base URL unless
//! `AzureConfig::keyvault_endpoint_override` is set (Pact mode).

use super::auth::credential;
use super::http::{api_url, RestClient};
use crate::config::AzureConfig;
use crate::constants::{KEYVAULT_DATA_PLANE_API_VERSION, KEYVAULT_SCOPE};
use crate::error::{Phase, Result as LifecycleResult};
use crate::lifecycle::{wait_for_state, PollConfig};
use crate::provider::{ApiResult, DeletedNestedItem, NestedItem, NestedItemsApi};
use crate::resource_id::{with_trailing_slash, NestedItemId, NestedItemKind};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Method, Url};
use tracing::{debug, debug_span, info, info_span, Instrument};

pub struct DataPlaneClient {
    rest: RestClient,
    endpoint_override: Option<String>,
}

impl std::fmt::Debug for DataPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPlaneClient")
            .field("endpoint_override", &self.endpoint_override)
            .finish_non_exhaustive()
    }
}

impl DataPlaneClient {
    /// # Errors
    /// Returns an error if the credential or HTTP client cannot be created
    pub fn new(config: &AzureConfig) -> Result<Self> {
        if let Some(endpoint) = &config.keyvault_endpoint_override {
            info!(
                "Pact mode enabled: routing Azure Key Vault requests to {}",
                endpoint
            );
        }
        Ok(Self {
            rest: RestClient::new(credential(config)?, KEYVAULT_SCOPE)?,
            endpoint_override: config
                .keyvault_endpoint_override
                .as_deref()
                .map(with_trailing_slash),
        })
    }

    fn base<'a>(&'a self, vault_base_url: &'a str) -> &'a str {
        self.endpoint_override.as_deref().unwrap_or(vault_base_url)
    }

    /// `{vault}/{collection}/{name}{suffix}`
    fn item_url(&self, id: &NestedItemId, suffix: &str) -> ApiResult<Url> {
        api_url(
            &format!(
                "{}{}/{}{suffix}",
                self.base(&id.vault_base_url),
                id.kind.collection(),
                id.name
            ),
            KEYVAULT_DATA_PLANE_API_VERSION,
        )
    }

    /// `{vault}/deleted{collection}/{name}{suffix}`
    fn deleted_item_url(&self, id: &NestedItemId, suffix: &str) -> ApiResult<Url> {
        api_url(
            &format!(
                "{}{}/{}{suffix}",
                self.base(&id.vault_base_url),
                id.kind.deleted_collection(),
                id.name
            ),
            KEYVAULT_DATA_PLANE_API_VERSION,
        )
    }

    /// Whether the vault at `vault_base_url` answers HTTP requests
    ///
    /// Any HTTP response counts, including 401 and 403; only transport
    /// failures (DNS not yet propagated, connection refused) do not.
    pub async fn is_vault_reachable(&self, vault_base_url: &str) -> bool {
        let url = match Url::parse(self.base(vault_base_url)) {
            Ok(url) => url,
            Err(e) => {
                debug!("Invalid vault URL {vault_base_url}: {e}");
                return false;
            }
        };
        match self.rest.probe(url).await {
            Ok(status) => {
                debug!(status, "Vault {vault_base_url} responded");
                true
            }
            Err(e) => {
                debug!("Vault {vault_base_url} not reachable yet: {e}");
                false
            }
        }
    }

    /// Poll until the vault's data plane is reachable
    ///
    /// # Errors
    /// Returns [`crate::Error::Timeout`] if it is not reachable within `poll.timeout`
    pub async fn wait_for_vault_available(
        &self,
        vault_base_url: &str,
        poll: &PollConfig,
    ) -> LifecycleResult<()> {
        let span = info_span!("azure.keyvault.wait_for_available", vault.url = vault_base_url);
        let resource = format!("Key Vault data plane {vault_base_url}");
        wait_for_state(&resource, Phase::Poll, "available", poll, || async move {
            Ok(self.is_vault_reachable(vault_base_url).await)
        })
        .instrument(span)
        .await
    }
}

#[async_trait]
impl NestedItemsApi for DataPlaneClient {
    async fn get_item(&self, id: &NestedItemId) -> ApiResult<Option<NestedItem>> {
        let span = debug_span!(
            "azure.keyvault.item.get",
            item.kind = %id.kind,
            item.name = %id.name,
        );
        let url = self.item_url(id, "")?;
        self.rest.get_json(url).instrument(span).await
    }

    async fn get_deleted_item(&self, id: &NestedItemId) -> ApiResult<Option<DeletedNestedItem>> {
        let span = debug_span!(
            "azure.keyvault.item.get_deleted",
            item.kind = %id.kind,
            item.name = %id.name
        );
        let url = self.deleted_item_url(id, "")?;
        self.rest.get_json(url).instrument(span).await
    }

    async fn create_item(
        &self,
        id: &NestedItemId,
        body: &serde_json::Value,
    ) -> ApiResult<NestedItem> {
        let span = info_span!(
            "azure.keyvault.item.create",
            item.kind = %id.kind,
            item.name = %id.name,
        );
        // Secrets are set in place; keys and certificates have a create action
        let (method, url) = match id.kind {
            NestedItemKind::Secret => (Method::PUT, self.item_url(id, "")?),
            NestedItemKind::Key | NestedItemKind::Certificate => {
                (Method::POST, self.item_url(id, "/create")?)
            }
        };
        self.rest
            .send_json(method, url, Some(body))
            .instrument(span)
            .await
    }

    async fn delete_item(&self, id: &NestedItemId) -> ApiResult<()> {
        let span = info_span!(
            "azure.keyvault.item.delete",
            item.kind = %id.kind,
            item.name = %id.name,
        );
        let url = self.item_url(id, "")?;
        self.rest
            .send_empty(Method::DELETE, url, None)
            .instrument(span)
            .await
    }

    async fn recover_deleted_item(&self, id: &NestedItemId) -> ApiResult<()> {
        let span = info_span!(
            "azure.keyvault.item.recover",
            item.kind = %id.kind,
            item.name = %id.name,
        );
        let url = self.deleted_item_url(id, "/recover")?;
        self.rest
            .send_empty(Method::POST, url, None)
            .instrument(span)
            .await
    }

    async fn purge_deleted_item(&self, id: &NestedItemId) -> ApiResult<()> {
        let span = info_span!(
            "azure.keyvault.item.purge",
            item.kind = %id.kind,
            item.name = %id.name,
        );
        let url = self.deleted_item_url(id, "")?;
        self.rest
            .send_empty(Method::DELETE, url, None)
            .instrument(span)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: Option<&str>) -> DataPlaneClient {
        let mut config = AzureConfig::new("sub").with_pact_endpoint("http://127.0.0.1:9");
        config.keyvault_endpoint_override = endpoint.map(str::to_string);
        DataPlaneClient::new(&config).unwrap()
    }

    #[test]
    fn test_item_urls() {
        let client = client(None);
        let id = NestedItemId::new("https://kv1.vault.azure.net", NestedItemKind::Key, "k1");
        assert_eq!(
            client.item_url(&id, "/create").unwrap().as_str(),
            "https://kv1.vault.azure.net/keys/k1/create?api-version=7.4"
        );
        assert_eq!(
            client.deleted_item_url(&id, "/recover").unwrap().as_str(),
            "https://kv1.vault.azure.net/deletedkeys/k1/recover?api-version=7.4"
        );
    }

    #[test]
    fn test_endpoint_override() {
        let client = client(Some("http://127.0.0.1:8080"));
        let id = NestedItemId::new("https://kv1.vault.azure.net/", NestedItemKind::Secret, "s1");
        assert_eq!(
            client.item_url(&id, "").unwrap().as_str(),
            "http://127.0.0.1:8080/secrets/s1?api-version=7.4"
        );
    }
}
