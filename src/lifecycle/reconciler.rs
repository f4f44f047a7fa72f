//! # Lifecycle Reconciler
//!
//! Drives create, update, delete and purge of a [`SoftDeletable`] resource and
//! waits for each transition to become observable.
//!
//! ## Create
//!
//! | Current state | Request | Outcome |
//! |---|---|---|
//! | Absent | any | create, wait for Active |
//! | SoftDeleted | `recover_if_soft_deleted` | recover, wait for Active |
//! | SoftDeleted | otherwise | `RequiresManualRecovery`, nothing mutated |
//! | Active | `allow_existing` | wait for Active |
//! | Active | otherwise | `AlreadyExists` |
//!
//! ## Delete
//!
//! Soft-delete settings are read before deleting, since the live resource is
//! gone afterwards. Deleting an absent resource succeeds. With
//! `purge_on_delete` the soft-deleted copy is purged, unless purge protection
//! is enabled, in which case delete succeeds without purging.
//!
//! Every transition holds the resource's [`SoftDeletable::lock`] guard, so a
//! create and a delete of the same resource never interleave.

use super::poll::wait_for_state;
use super::types::{Action, LifecycleRequest, ResourceState, SoftDeletable, SoftDeleteSettings};
use crate::error::{Error, Phase, Result};
use crate::observability::metrics;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug)]
pub struct LifecycleReconciler<R> {
    resource: R,
}

impl<R: SoftDeletable> LifecycleReconciler<R> {
    pub fn new(resource: R) -> Self {
        Self { resource }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Drive the transition named by `request.action`
    ///
    /// # Errors
    /// See [`Self::create_or_recover`], [`Self::update`] and [`Self::delete_or_purge`]
    pub async fn reconcile(&self, request: &LifecycleRequest) -> Result<()> {
        match request.action {
            Action::Create => self.create_or_recover(request).await,
            Action::Update => self.update(request).await,
            Action::Delete => self.delete_or_purge(request).await,
        }
    }

    /// Create the resource, or recover its soft-deleted copy
    ///
    /// # Errors
    /// - [`Error::AlreadyExists`] when active and `allow_existing` is not set
    /// - [`Error::RequiresManualRecovery`] when soft-deleted and recovery is not requested
    /// - [`Error::Timeout`] when the resource is not observed active in time
    /// - [`Error::Remote`] for failed remote calls
    pub async fn create_or_recover(&self, request: &LifecycleRequest) -> Result<()> {
        let span = info_span!(
            "keyvault.lifecycle.create_or_recover",
            resource.name = %request.resource_name,
            recover = request.recover_if_soft_deleted,
        );

        async move {
            let _guard = self.resource.lock().await;
            let resource = self.resource.describe();
            let phase = match self.resource.state().await? {
                ResourceState::Active => {
                    if !request.allow_existing {
                        metrics::record_lifecycle_operation(Phase::Precondition, false);
                        return Err(Error::AlreadyExists { resource });
                    }
                    info!("{resource} already exists, re-using it");
                    Phase::Create
                }
                ResourceState::SoftDeleted => {
                    if !request.recover_if_soft_deleted {
                        metrics::record_lifecycle_operation(Phase::Precondition, false);
                        return Err(Error::RequiresManualRecovery { resource });
                    }
                    info!("{resource} is soft-deleted, recovering it");
                    self.mutate(Phase::Recover, self.resource.recover()).await?;
                    Phase::Recover
                }
                ResourceState::Absent => {
                    info!("Creating {resource}");
                    self.mutate(Phase::Create, self.resource.create()).await?;
                    Phase::Create
                }
            };

            self.wait_for(phase, request, "Active", |state| {
                state == ResourceState::Active
            })
            .await?;
            info!("{resource} is active");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Update an active resource
    ///
    /// # Errors
    /// - [`Error::NotFound`] when the resource is not active
    /// - [`Error::Timeout`] when the resource is not observed active in time
    /// - [`Error::Remote`] for failed remote calls
    pub async fn update(&self, request: &LifecycleRequest) -> Result<()> {
        let span = info_span!(
            "keyvault.lifecycle.update",
            resource.name = %request.resource_name,
        );

        async move {
            let _guard = self.resource.lock().await;
            let resource = self.resource.describe();
            if self.resource.state().await? != ResourceState::Active {
                metrics::record_lifecycle_operation(Phase::Update, false);
                return Err(Error::NotFound {
                    resource,
                    phase: Phase::Update,
                });
            }

            info!("Updating {resource}");
            self.mutate(Phase::Update, self.resource.update()).await?;
            self.wait_for(Phase::Update, request, "Active", |state| {
                state == ResourceState::Active
            })
            .await
        }
        .instrument(span)
        .await
    }

    /// Delete the resource and, when requested and permitted, purge it
    ///
    /// # Errors
    /// - [`Error::Timeout`] when the delete or purge is not observed in time
    /// - [`Error::Remote`] for failed remote calls other than not-found
    pub async fn delete_or_purge(&self, request: &LifecycleRequest) -> Result<()> {
        let span = info_span!(
            "keyvault.lifecycle.delete_or_purge",
            resource.name = %request.resource_name,
            purge = request.purge_on_delete,
        );

        async move {
            let _guard = self.resource.lock().await;
            let resource = self.resource.describe();
            let state = self.resource.state().await?;
            if state == ResourceState::Absent {
                info!("{resource} is already absent");
                return Ok(());
            }

            let settings = self.resource.soft_delete_settings().await?;
            debug!(
                soft_delete = settings.soft_delete_enabled,
                purge_protection = settings.purge_protection_enabled,
                "Read soft-delete settings of {resource}"
            );

            if state == ResourceState::Active {
                info!("Deleting {resource}");
                self.mutate_tolerating_not_found(Phase::Delete, self.resource.delete())
                    .await?;
                self.wait_for(Phase::Delete, request, "deleted", |state| {
                    state != ResourceState::Active
                })
                .await?;
            }

            if !request.purge_on_delete || !settings.soft_delete_enabled {
                return Ok(());
            }

            if settings.purge_protection_enabled {
                self.log_purge_protected(&resource).await;
                return Ok(());
            }

            self.purge_soft_deleted(request).await
        }
        .instrument(span)
        .await
    }

    /// Purge the soft-deleted copy of the resource
    ///
    /// # Errors
    /// - [`Error::PurgeNotPermitted`] when purge protection is enabled; no purge call is made
    /// - [`Error::NotFound`] when the resource is active and has no soft-deleted copy
    /// - [`Error::Timeout`] when the purge is not observed in time
    /// - [`Error::Remote`] for failed remote calls other than not-found
    pub async fn purge(&self, request: &LifecycleRequest) -> Result<()> {
        let span = info_span!(
            "keyvault.lifecycle.purge",
            resource.name = %request.resource_name,
        );

        async move {
            let _guard = self.resource.lock().await;
            let resource = self.resource.describe();
            let state = self.resource.state().await?;
            match state {
                ResourceState::Absent => {
                    info!("{resource} is already absent, nothing to purge");
                    return Ok(());
                }
                ResourceState::Active => {
                    return Err(Error::NotFound {
                        resource: format!("soft-deleted {resource}"),
                        phase: Phase::Purge,
                    });
                }
                ResourceState::SoftDeleted => {}
            }

            let SoftDeleteSettings {
                purge_protection_enabled,
                ..
            } = self.resource.soft_delete_settings().await?;
            if purge_protection_enabled {
                metrics::record_lifecycle_operation(Phase::Purge, false);
                return Err(Error::PurgeNotPermitted { resource });
            }

            self.purge_soft_deleted(request).await
        }
        .instrument(span)
        .await
    }

    async fn purge_soft_deleted(&self, request: &LifecycleRequest) -> Result<()> {
        let resource = self.resource.describe();
        info!("Purging {resource}");
        self.mutate_tolerating_not_found(Phase::Purge, self.resource.purge())
            .await?;
        self.wait_for(Phase::Purge, request, "Absent", |state| {
            state == ResourceState::Absent
        })
        .await?;
        info!("Purged {resource}");
        Ok(())
    }

    async fn log_purge_protected(&self, resource: &str) {
        match self.resource.deletion_schedule().await {
            Ok(Some(schedule)) => info!(
                deleted_at = ?schedule.deleted_at,
                scheduled_purge_at = ?schedule.scheduled_purge_at,
                "{resource} has purge protection enabled and will not be purged; \
                 it stays soft-deleted until its scheduled purge date"
            ),
            Ok(None) => info!(
                "{resource} has purge protection enabled and will not be purged"
            ),
            Err(e) => warn!(
                "{resource} has purge protection enabled and will not be purged; \
                 reading its deletion schedule failed: {e}"
            ),
        }
    }

    async fn wait_for(
        &self,
        phase: Phase,
        request: &LifecycleRequest,
        target: &str,
        reached: impl Fn(ResourceState) -> bool,
    ) -> Result<()> {
        let resource = self.resource.describe();
        let reached = &reached;
        wait_for_state(&resource, phase, target, &request.poll, || async move {
            self.resource.state().await.map(reached)
        })
        .await
        .inspect_err(|_| metrics::record_lifecycle_operation(phase, false))?;
        metrics::record_lifecycle_operation(phase, true);
        Ok(())
    }

    async fn mutate(
        &self,
        phase: Phase,
        call: impl std::future::Future<Output = Result<()>>,
    ) -> Result<()> {
        call.await
            .inspect_err(|_| metrics::record_lifecycle_operation(phase, false))
    }

    async fn mutate_tolerating_not_found(
        &self,
        phase: Phase,
        call: impl std::future::Future<Output = Result<()>>,
    ) -> Result<()> {
        match call.await {
            Err(e) if e.is_not_found() => {
                debug!("{phase}: {} was already gone", self.resource.describe());
                Ok(())
            }
            other => other.inspect_err(|_| metrics::record_lifecycle_operation(phase, false)),
        }
    }
}
