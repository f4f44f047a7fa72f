//! Lifecycle types shared by the reconciler and the resources it drives.

use super::poll::PollConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::OwnedMutexGuard;

/// Observed state of a soft-deletable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Neither live nor soft-deleted
    Absent,
    /// Deleted but recoverable until purged or its retention elapses
    SoftDeleted,
    Active,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceState::Absent => "Absent",
            ResourceState::SoftDeleted => "SoftDeleted",
            ResourceState::Active => "Active",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

/// A single lifecycle transition to drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRequest {
    pub resource_name: String,
    pub action: Action,
    /// Recover a soft-deleted resource of the same name instead of failing create
    pub recover_if_soft_deleted: bool,
    /// Purge after a soft delete, unless purge protection forbids it
    pub purge_on_delete: bool,
    /// Treat create of an already active resource as success
    pub allow_existing: bool,
    pub poll: PollConfig,
}

impl LifecycleRequest {
    pub fn new(resource_name: impl Into<String>, action: Action, poll: PollConfig) -> Self {
        Self {
            resource_name: resource_name.into(),
            action,
            recover_if_soft_deleted: false,
            purge_on_delete: false,
            allow_existing: false,
            poll,
        }
    }

    #[must_use]
    pub fn recover_if_soft_deleted(mut self, recover: bool) -> Self {
        self.recover_if_soft_deleted = recover;
        self
    }

    #[must_use]
    pub fn purge_on_delete(mut self, purge: bool) -> Self {
        self.purge_on_delete = purge;
        self
    }

    #[must_use]
    pub fn allow_existing(mut self, allow: bool) -> Self {
        self.allow_existing = allow;
        self
    }
}

/// Soft-delete configuration in effect for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftDeleteSettings {
    pub soft_delete_enabled: bool,
    pub purge_protection_enabled: bool,
}

impl Default for SoftDeleteSettings {
    fn default() -> Self {
        Self {
            soft_delete_enabled: true,
            purge_protection_enabled: false,
        }
    }
}

/// When a soft-deleted resource was deleted and when it will be purged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeletionSchedule {
    pub deleted_at: Option<DateTime<Utc>>,
    pub scheduled_purge_at: Option<DateTime<Utc>>,
}

/// A remote resource the reconciler can create, recover, delete and purge
///
/// Mutating calls return once the remote API accepted the request; the
/// reconciler polls [`SoftDeletable::state`] afterwards. Errors name the
/// resource and the phase they occurred in.
#[async_trait]
pub trait SoftDeletable: Send + Sync {
    /// Human-readable name used in logs and errors
    fn describe(&self) -> String;

    async fn state(&self) -> Result<ResourceState>;

    /// Settings of the live resource, or of its soft-deleted copy
    async fn soft_delete_settings(&self) -> Result<SoftDeleteSettings>;

    async fn create(&self) -> Result<()>;

    async fn update(&self) -> Result<()>;

    async fn recover(&self) -> Result<()>;

    async fn delete(&self) -> Result<()>;

    async fn purge(&self) -> Result<()>;

    /// Deletion and purge dates of the soft-deleted copy, when known
    async fn deletion_schedule(&self) -> Result<Option<DeletionSchedule>> {
        Ok(None)
    }

    /// Guard held by the reconciler for the whole of a transition
    ///
    /// Resources sharing a name must hand out the same lock. `None` means
    /// transitions are not serialized.
    async fn lock(&self) -> Option<OwnedMutexGuard<()>> {
        None
    }
}
