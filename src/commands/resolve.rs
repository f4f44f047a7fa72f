//! # Resolve Commands
//!
//! `resolve` and `lookup`: the two directions of identity resolution.

use super::{parse_vault_id, Context};
use anyhow::{Context as _, Result};
use keyvault_lifecycle::config::AzureConfig;
use keyvault_lifecycle::resource_id::base_url_for_vault_name;

/// Print the data-plane base URI of a vault
pub async fn resolve_command(ctx: &Context, vault_id: &str) -> Result<()> {
    let id = parse_vault_id(vault_id)?;
    let base_uri = ctx
        .resolver
        .base_uri_for_vault(&id)
        .await
        .with_context(|| format!("Failed to resolve {id}"))?;
    println!("{base_uri}");
    Ok(())
}

/// The URL to look up: given directly, or built from a vault name and the
/// configured Key Vault DNS suffix
fn lookup_url(
    config: &AzureConfig,
    vault_url: Option<&str>,
    vault_name: Option<&str>,
) -> Result<String> {
    match (vault_url, vault_name) {
        (Some(url), _) => Ok(url.to_string()),
        (None, Some(name)) => Ok(base_url_for_vault_name(name, &config.keyvault_dns_suffix)),
        (None, None) => anyhow::bail!("Either --vault-url or --vault-name is required"),
    }
}

/// Print the management identifier of the vault serving `vault_url`
pub async fn lookup_command(
    ctx: &Context,
    vault_url: Option<&str>,
    vault_name: Option<&str>,
    subscription_id: Option<String>,
) -> Result<()> {
    let vault_url = lookup_url(&ctx.config, vault_url, vault_name)?;
    let subscription_id = subscription_id.unwrap_or_else(|| ctx.config.subscription_id.clone());
    let id = ctx
        .resolver
        .vault_id_from_base_url(&subscription_id, &vault_url)
        .await
        .with_context(|| format!("Failed to look up the vault serving {vault_url}"))?;

    match id {
        Some(id) => {
            println!("{id}");
            Ok(())
        }
        None => Err(anyhow::anyhow!(
            "No Key Vault serving {vault_url} was found in subscription {subscription_id}"
        )),
    }
}
