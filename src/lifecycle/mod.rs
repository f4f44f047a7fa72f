//! # Lifecycle
//!
//! Soft-delete-aware create, update, delete and purge of Key Vaults and the
//! items inside them.
//!
//! - `poll`: debounced polling until a transition is observable
//! - `types`: states, requests and the [`SoftDeletable`] trait
//! - `reconciler`: the state machine driving a [`SoftDeletable`]
//! - `vault`: vaults, wired to the identity resolver cache
//! - `nested`: secrets, keys and certificates

pub mod nested;
pub mod poll;
pub mod reconciler;
pub mod types;
pub mod vault;

pub use nested::NestedItemResource;
pub use poll::{wait_for_state, PollConfig};
pub use reconciler::LifecycleReconciler;
pub use types::{
    Action, DeletionSchedule, LifecycleRequest, ResourceState, SoftDeletable,
    SoftDeleteSettings,
};
pub use vault::VaultResource;
