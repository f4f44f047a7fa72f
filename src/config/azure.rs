//! # Azure Configuration
//!
//! Subscription, endpoints and authentication for the Key Vault clients.
//!
//! When `PACT_MODE` is set, the management and data-plane endpoints can be
//! routed to Pact mock servers through `AZURE_MANAGEMENT_ENDPOINT` and
//! `AZURE_KEY_VAULT_ENDPOINT`, and a mock credential is used.

use super::{env_var_or_default_bool, env_var_or_default_str};
use crate::constants::{DEFAULT_KEYVAULT_DNS_SUFFIX, DEFAULT_MANAGEMENT_ENDPOINT};
use anyhow::{Context, Result};

/// How to obtain tokens for Azure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AzureAuth {
    /// Managed Identity (works in AKS, App Service, VMs)
    ManagedIdentity,
    /// Workload Identity federation with the given client ID
    WorkloadIdentity { client_id: String },
}

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub subscription_id: String,
    pub tenant_id: Option<String>,
    /// Azure Resource Manager endpoint, without trailing slash
    pub management_endpoint: String,
    /// DNS suffix of data-plane vault hosts, e.g. `vault.azure.net`
    pub keyvault_dns_suffix: String,
    /// When set, all data-plane requests go to this endpoint instead of the vault URI
    pub keyvault_endpoint_override: Option<String>,
    pub auth: AzureAuth,
    /// Route requests to Pact mock servers and use a mock credential
    pub pact_mode: bool,
}

impl AzureConfig {
    /// Configuration for a subscription in the public cloud, authenticating with Managed Identity
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            tenant_id: None,
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            keyvault_dns_suffix: DEFAULT_KEYVAULT_DNS_SUFFIX.to_string(),
            keyvault_endpoint_override: None,
            auth: AzureAuth::ManagedIdentity,
            pact_mode: false,
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `ARM_SUBSCRIPTION_ID` is not set
    pub fn from_env() -> Result<Self> {
        let subscription_id = std::env::var("ARM_SUBSCRIPTION_ID")
            .context("ARM_SUBSCRIPTION_ID must be set to the subscription containing the vaults")?;

        let pact_mode = env_var_or_default_bool("PACT_MODE", false);

        let mut management_endpoint =
            env_var_or_default_str("ARM_ENVIRONMENT_ENDPOINT", DEFAULT_MANAGEMENT_ENDPOINT);
        let mut keyvault_endpoint_override = None;
        if pact_mode {
            if let Ok(endpoint) = std::env::var("AZURE_MANAGEMENT_ENDPOINT") {
                management_endpoint = endpoint;
            }
            keyvault_endpoint_override = std::env::var("AZURE_KEY_VAULT_ENDPOINT").ok();
        }

        let auth = match std::env::var("ARM_CLIENT_ID") {
            Ok(client_id) if !client_id.is_empty() => AzureAuth::WorkloadIdentity { client_id },
            _ => AzureAuth::ManagedIdentity,
        };

        Ok(Self {
            subscription_id,
            tenant_id: std::env::var("ARM_TENANT_ID").ok(),
            management_endpoint: management_endpoint.trim_end_matches('/').to_string(),
            keyvault_dns_suffix: env_var_or_default_str(
                "KEYVAULT_DNS_SUFFIX",
                DEFAULT_KEYVAULT_DNS_SUFFIX,
            ),
            keyvault_endpoint_override,
            auth,
            pact_mode,
        })
    }

    /// Point the clients at a mock server and use the mock credential
    #[must_use]
    pub fn with_pact_endpoint(mut self, endpoint: &str) -> Self {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        self.management_endpoint.clone_from(&endpoint);
        self.keyvault_endpoint_override = Some(endpoint);
        self.pact_mode = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_public_cloud_defaults() {
        let config = AzureConfig::new("sub");
        assert_eq!(config.management_endpoint, "https://management.azure.com");
        assert_eq!(config.keyvault_dns_suffix, "vault.azure.net");
        assert_eq!(config.auth, AzureAuth::ManagedIdentity);
        assert!(!config.pact_mode);
    }

    #[test]
    fn test_with_pact_endpoint_routes_both_planes() {
        let config = AzureConfig::new("sub").with_pact_endpoint("http://127.0.0.1:1234/");
        assert_eq!(config.management_endpoint, "http://127.0.0.1:1234");
        assert_eq!(
            config.keyvault_endpoint_override.as_deref(),
            Some("http://127.0.0.1:1234")
        );
        assert!(config.pact_mode);
    }
}
