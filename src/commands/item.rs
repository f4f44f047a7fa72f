//! # Item Commands
//!
//! `create-item` and `delete-item` for secrets, keys and certificates.

use super::Context;
use anyhow::{Context as _, Result};
use keyvault_lifecycle::lifecycle::{
    Action, LifecycleReconciler, LifecycleRequest, NestedItemResource,
};
use keyvault_lifecycle::resource_id::NestedItemId;
use std::sync::Arc;

fn parse_item_url(item_url: &str) -> Result<NestedItemId> {
    NestedItemId::parse(item_url).with_context(|| format!("Invalid item URL {item_url:?}"))
}

fn item_resource(ctx: &Context, id: &NestedItemId) -> Result<NestedItemResource> {
    let items = Arc::new(ctx.data_plane()?);
    Ok(NestedItemResource::new(
        id.clone(),
        &ctx.config.subscription_id,
        items,
        Arc::clone(&ctx.resolver),
    ))
}

/// Payload for the item's create call, e.g. `{"value": "..."}` for a secret
fn parse_body(body: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(body).context("--body must be a JSON document")?;
    anyhow::ensure!(value.is_object(), "--body must be a JSON object, got {value}");
    Ok(value)
}

/// Create an item, or recover its soft-deleted copy when allowed
pub async fn create_item_command(
    ctx: &Context,
    item_url: &str,
    body: &str,
    recover: bool,
    allow_existing: bool,
) -> Result<()> {
    let id = parse_item_url(item_url)?;
    let resource = item_resource(ctx, &id)?.with_body(parse_body(body)?);

    let request = LifecycleRequest::new(&id.name, Action::Create, ctx.polling.nested_item())
        .recover_if_soft_deleted(recover && ctx.features.recover_soft_deleted_items)
        .allow_existing(allow_existing);
    LifecycleReconciler::new(resource)
        .reconcile(&request)
        .await
        .with_context(|| format!("Failed to create {id}"))?;

    println!("Created {id}");
    Ok(())
}

/// Delete an item, purging it when requested and its vault permits it
pub async fn delete_item_command(ctx: &Context, item_url: &str, purge: bool) -> Result<()> {
    let id = parse_item_url(item_url)?;
    let resource = item_resource(ctx, &id)?;

    let request = LifecycleRequest::new(&id.name, Action::Delete, ctx.polling.nested_item())
        .purge_on_delete(purge && ctx.features.purge_soft_deleted_items_on_destroy);
    LifecycleReconciler::new(resource)
        .reconcile(&request)
        .await
        .with_context(|| format!("Failed to delete {id}"))?;

    println!("Deleted {id}");
    Ok(())
}
