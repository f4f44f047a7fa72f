//! # Vault Commands
//!
//! `create`, `delete` and `purge` of Key Vaults.

use super::{parse_vault_id, Context};
use anyhow::{Context as _, Result};
use keyvault_lifecycle::config::AzureConfig;
use keyvault_lifecycle::lifecycle::{
    Action, LifecycleReconciler, LifecycleRequest, VaultResource,
};
use keyvault_lifecycle::provider::{
    Sku, SkuName, VaultCreateParameters, VaultProperties, VaultsApi,
};
use keyvault_lifecycle::resource_id::KeyVaultId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct CreateArgs {
    pub vault_id: String,
    pub location: String,
    /// Falls back to the configured `ARM_TENANT_ID`
    pub tenant_id: Option<String>,
    pub sku: SkuName,
    pub purge_protection: bool,
    pub soft_delete_retention_days: u32,
    pub recover: bool,
    pub allow_existing: bool,
    pub wait_for_data_plane: bool,
}

fn tenant_id(args: &CreateArgs, config: &AzureConfig) -> Result<String> {
    args.tenant_id
        .clone()
        .or_else(|| config.tenant_id.clone())
        .context("A tenant is required to create a vault: pass --tenant-id or set ARM_TENANT_ID")
}

fn create_parameters(args: &CreateArgs, tenant_id: String) -> VaultCreateParameters {
    VaultCreateParameters {
        location: args.location.clone(),
        properties: VaultProperties {
            tenant_id: Some(tenant_id),
            sku: Some(Sku::new(args.sku)),
            enable_soft_delete: Some(true),
            // Azure rejects an explicit `false`; leave unset unless enabling
            enable_purge_protection: args.purge_protection.then_some(true),
            soft_delete_retention_in_days: Some(args.soft_delete_retention_days),
            access_policies: Some(Vec::new()),
            ..Default::default()
        },
        tags: HashMap::new(),
    }
}

/// Create a vault, or recover its soft-deleted copy, and print its base URI
pub async fn create_command(ctx: &Context, args: CreateArgs) -> Result<()> {
    let id = parse_vault_id(&args.vault_id)?;
    let parameters = create_parameters(&args, tenant_id(&args, &ctx.config)?);
    let resource = VaultResource::new(id.clone(), parameters, Arc::clone(&ctx.resolver));
    let reconciler = LifecycleReconciler::new(resource);

    let request =
        LifecycleRequest::new(&id.vault_name, Action::Create, ctx.polling.vault_create())
            .recover_if_soft_deleted(args.recover && ctx.features.recover_soft_deleted_vaults)
            .allow_existing(args.allow_existing);
    reconciler
        .reconcile(&request)
        .await
        .with_context(|| format!("Failed to create {id}"))?;

    let base_uri = ctx.resolver.base_uri_for_vault(&id).await?;
    if args.wait_for_data_plane {
        info!("Waiting for the data plane of {} to become available", id.vault_name);
        ctx.data_plane()?
            .wait_for_vault_available(&base_uri, &ctx.polling.vault_create())
            .await?;
    }
    println!("{base_uri}");
    Ok(())
}

/// Delete a vault, purging it when requested and permitted
pub async fn delete_command(
    ctx: &Context,
    vault_id: &str,
    location: Option<String>,
    purge: bool,
) -> Result<()> {
    let id = parse_vault_id(vault_id)?;
    let Some(location) = location_of(ctx, &id, location).await? else {
        println!(
            "{id} does not exist. If it is soft-deleted, purge it with `kvctl purge --location`"
        );
        return Ok(());
    };

    let resource = VaultResource::existing(id.clone(), location, Arc::clone(&ctx.resolver));
    let reconciler = LifecycleReconciler::new(resource);
    let request =
        LifecycleRequest::new(&id.vault_name, Action::Delete, ctx.polling.vault_delete())
            .purge_on_delete(purge && ctx.features.purge_soft_delete_on_destroy);
    reconciler
        .reconcile(&request)
        .await
        .with_context(|| format!("Failed to delete {id}"))?;

    println!("Deleted {id}");
    Ok(())
}

/// Purge a soft-deleted vault
pub async fn purge_command(ctx: &Context, vault_id: &str, location: &str) -> Result<()> {
    let id = parse_vault_id(vault_id)?;
    let resource = VaultResource::existing(id.clone(), location, Arc::clone(&ctx.resolver));
    let reconciler = LifecycleReconciler::new(resource);
    let request =
        LifecycleRequest::new(&id.vault_name, Action::Delete, ctx.polling.vault_delete());
    reconciler
        .purge(&request)
        .await
        .with_context(|| format!("Failed to purge {id}"))?;

    println!("Purged {id}");
    Ok(())
}

/// The explicit location, or the live vault's; `None` when the vault is gone
async fn location_of(
    ctx: &Context,
    id: &KeyVaultId,
    location: Option<String>,
) -> Result<Option<String>> {
    if location.is_some() {
        return Ok(location);
    }
    let vault = ctx
        .resolver
        .vaults_api()
        .get_vault(id)
        .await
        .with_context(|| format!("Failed to read {id}"))?;
    Ok(vault.and_then(|v| v.location))
}
