//! # Azure Providers
//!
//! REST implementations of the provider traits against Azure.
//!
//! - `vaults`: ARM management plane for `Microsoft.KeyVault/vaults`
//! - `data_plane`: secrets, keys and certificates inside a vault
//! - `auth`: credential selection (Workload Identity, Managed Identity, Pact mock)

pub mod auth;
pub mod data_plane;
mod http;
pub mod vaults;

// Re-export for convenience
pub use auth::credential;
pub use data_plane::DataPlaneClient;
pub use vaults::ArmVaultsClient;
