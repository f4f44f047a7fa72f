//! # kvctl
//!
//! Operator CLI for resolving Key Vault identities and driving soft-delete-aware
//! vault and item lifecycles.
//!
//! ## Usage
//!
//! ```bash
//! # Data-plane URI of a vault
//! kvctl resolve --vault-id /subscriptions/<sub>/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/kv1
//!
//! # Management identifier of the vault behind a URI, or behind a vault name
//! kvctl lookup --vault-url https://kv1.vault.azure.net/
//! kvctl lookup --vault-name kv1
//!
//! # Create (or recover) a vault and wait until its data plane answers
//! kvctl create --vault-id <id> --location westeurope --tenant-id <tenant> --wait-for-data-plane
//!
//! # Delete a vault and purge it unless purge protection is enabled
//! kvctl delete --vault-id <id>
//!
//! # Create a secret, recovering a soft-deleted one of the same name
//! kvctl create-item --item-url https://kv1.vault.azure.net/secrets/db-password --body '{"value": "..."}'
//!
//! # Delete a secret, keeping its soft-deleted copy
//! kvctl delete-item --item-url https://kv1.vault.azure.net/secrets/db-password --no-purge
//! ```
//!
//! Configuration comes from the environment, see `keyvault_lifecycle::config`.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use keyvault_lifecycle::constants::DEFAULT_SOFT_DELETE_RETENTION_DAYS;
use keyvault_lifecycle::observability::metrics;
use keyvault_lifecycle::provider::SkuName;
use tracing_subscriber::EnvFilter;

mod commands;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Key Vault lifecycle CLI
#[derive(Parser, Debug)]
#[command(name = "kvctl", version = VERSION, about = "Azure Key Vault identity and lifecycle CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print Prometheus metrics collected during the command to stdout
    #[arg(long, global = true)]
    print_metrics: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the data-plane base URI of a vault
    Resolve {
        /// Management identifier of the vault
        #[arg(long)]
        vault_id: String,
    },
    /// Print the management identifier of the vault serving a data-plane URI
    Lookup {
        /// Data-plane base URI, e.g. https://kv1.vault.azure.net/
        #[arg(long, required_unless_present = "vault_name", conflicts_with = "vault_name")]
        vault_url: Option<String>,

        /// Vault name; the URI is built with the configured KEYVAULT_DNS_SUFFIX
        #[arg(long)]
        vault_name: Option<String>,

        /// Subscription to search (defaults to ARM_SUBSCRIPTION_ID)
        #[arg(long)]
        subscription_id: Option<String>,
    },
    /// Create a vault, recovering a soft-deleted one of the same name if allowed
    Create {
        #[arg(long)]
        vault_id: String,

        #[arg(long)]
        location: String,

        /// Tenant used to authenticate requests to the vault (defaults to ARM_TENANT_ID)
        #[arg(long)]
        tenant_id: Option<String>,

        #[arg(long, value_enum, default_value_t = Sku::Standard)]
        sku: Sku,

        /// Enable purge protection (cannot be disabled afterwards)
        #[arg(long)]
        purge_protection: bool,

        /// Days a deleted vault is retained before it is purged
        #[arg(
            long,
            default_value_t = DEFAULT_SOFT_DELETE_RETENTION_DAYS,
            value_parser = clap::value_parser!(u32).range(7..=90)
        )]
        soft_delete_retention_days: u32,

        /// Fail instead of recovering a soft-deleted vault
        #[arg(long)]
        no_recover: bool,

        /// Succeed if the vault already exists
        #[arg(long)]
        allow_existing: bool,

        /// Also wait until the vault's data plane answers requests
        #[arg(long)]
        wait_for_data_plane: bool,
    },
    /// Delete a vault and purge it unless purge protection is enabled
    Delete {
        #[arg(long)]
        vault_id: String,

        /// Location of the vault; looked up when omitted
        #[arg(long)]
        location: Option<String>,

        /// Keep the soft-deleted vault instead of purging it
        #[arg(long)]
        no_purge: bool,
    },
    /// Purge a soft-deleted vault
    Purge {
        #[arg(long)]
        vault_id: String,

        #[arg(long)]
        location: String,
    },
    /// Create a secret, key or certificate, recovering a soft-deleted one if allowed
    CreateItem {
        /// e.g. https://kv1.vault.azure.net/secrets/db-password
        #[arg(long)]
        item_url: String,

        /// JSON create payload, e.g. '{"value": "..."}' for a secret
        #[arg(long)]
        body: String,

        /// Fail instead of recovering a soft-deleted item
        #[arg(long)]
        no_recover: bool,

        /// Succeed if the item already exists
        #[arg(long)]
        allow_existing: bool,
    },
    /// Delete a secret, key or certificate and purge it unless its vault is purge-protected
    DeleteItem {
        /// e.g. https://kv1.vault.azure.net/secrets/db-password
        #[arg(long)]
        item_url: String,

        /// Keep the soft-deleted item instead of purging it
        #[arg(long)]
        no_purge: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Sku {
    Standard,
    Premium,
}

impl From<Sku> for SkuName {
    fn from(sku: Sku) -> Self {
        match sku {
            Sku::Standard => SkuName::Standard,
            Sku::Premium => SkuName::Premium,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kvctl=info,keyvault_lifecycle=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider FIRST, before any other operations
    // Required for rustls 0.23+ when no default provider is set via features
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_existing| anyhow!("Failed to install rustls crypto provider"))?;

    init_tracing();
    metrics::register_metrics().context("Failed to register metrics")?;

    let cli = Cli::parse();
    let ctx = commands::Context::from_env()?;

    let result = match cli.command {
        Commands::Resolve { vault_id } => commands::resolve::resolve_command(&ctx, &vault_id).await,
        Commands::Lookup {
            vault_url,
            vault_name,
            subscription_id,
        } => {
            commands::resolve::lookup_command(
                &ctx,
                vault_url.as_deref(),
                vault_name.as_deref(),
                subscription_id,
            )
            .await
        }
        Commands::Create {
            vault_id,
            location,
            tenant_id,
            sku,
            purge_protection,
            soft_delete_retention_days,
            no_recover,
            allow_existing,
            wait_for_data_plane,
        } => {
            let args = commands::vault::CreateArgs {
                vault_id,
                location,
                tenant_id,
                sku: sku.into(),
                purge_protection,
                soft_delete_retention_days,
                recover: !no_recover,
                allow_existing,
                wait_for_data_plane,
            };
            commands::vault::create_command(&ctx, args).await
        }
        Commands::Delete {
            vault_id,
            location,
            no_purge,
        } => commands::vault::delete_command(&ctx, &vault_id, location, !no_purge).await,
        Commands::Purge { vault_id, location } => {
            commands::vault::purge_command(&ctx, &vault_id, &location).await
        }
        Commands::CreateItem {
            item_url,
            body,
            no_recover,
            allow_existing,
        } => {
            commands::item::create_item_command(&ctx, &item_url, &body, !no_recover, allow_existing)
                .await
        }
        Commands::DeleteItem { item_url, no_purge } => {
            commands::item::delete_item_command(&ctx, &item_url, !no_purge).await
        }
    };

    if cli.print_metrics {
        print!("{}", metrics::encode_metrics()?);
    }
    result
}
