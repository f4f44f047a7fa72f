//! # Azure Credentials
//!
//! Picks the token credential for the configured authentication method.
//! In Pact mode a mock credential hands out a dummy token.

use crate::config::{AzureAuth, AzureConfig};
use crate::provider::{ApiError, ApiResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use azure_core::credentials::{AccessToken, Secret, TokenCredential, TokenRequestOptions};
use azure_identity::{ManagedIdentityCredential, WorkloadIdentityCredential};
use std::sync::Arc;
use tracing::{debug, info};

/// Mock TokenCredential for Pact testing
/// Returns a dummy token without attempting real Azure authentication
#[derive(Debug)]
struct MockTokenCredential;

#[async_trait]
impl TokenCredential for MockTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        use typespec_client_core::time::{Duration, OffsetDateTime};

        Ok(AccessToken::new(
            Secret::new("test-token".to_string()),
            OffsetDateTime::now_utc() + Duration::seconds(3600),
        ))
    }
}

/// Build the credential for `config`
///
/// # Errors
/// Returns an error if the identity credential cannot be constructed
pub fn credential(config: &AzureConfig) -> Result<Arc<dyn TokenCredential>> {
    if config.pact_mode {
        debug!("Pact mode: using mock Azure credential");
        return Ok(Arc::new(MockTokenCredential));
    }

    let credential: Arc<dyn TokenCredential> = match &config.auth {
        AzureAuth::WorkloadIdentity { client_id } => {
            info!(
                "Using Azure Workload Identity authentication with client ID: {}",
                client_id
            );
            let options = azure_identity::WorkloadIdentityCredentialOptions {
                client_id: Some(client_id.clone()),
                ..Default::default()
            };
            WorkloadIdentityCredential::new(Some(options))
                .context("Failed to create WorkloadIdentityCredential")?
        }
        AzureAuth::ManagedIdentity => {
            info!("Using Managed Identity authentication");
            ManagedIdentityCredential::new(None)
                .context("Failed to create ManagedIdentityCredential")?
        }
    };
    Ok(credential)
}

/// Fetch a bearer token for `scope`
pub(crate) async fn bearer_token(
    credential: &dyn TokenCredential,
    scope: &str,
) -> ApiResult<String> {
    let token = credential
        .get_token(&[scope], Some(TokenRequestOptions::default()))
        .await
        .map_err(|e| ApiError::transport(format!("Failed to get access token for {scope}: {e}")))?;
    Ok(token.token.secret().to_string())
}
