//! # Errors
//!
//! Error taxonomy shared by the identity resolver and the lifecycle reconciler.
//!
//! Every variant names the resource it concerns, and where relevant the
//! [`Phase`] that failed, so an operator can tell "does not exist" apart from
//! "soft-deleted" and from "timed out waiting for propagation".

use crate::provider::ApiError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The step of an operation in which an error surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Resolving between a management identifier and a data-plane address
    Resolve,
    /// Checking the current state before a mutating call
    Precondition,
    Create,
    Recover,
    Update,
    Delete,
    Purge,
    /// Waiting for a transition to become observable
    Poll,
}

impl Phase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Resolve => "resolve",
            Phase::Precondition => "precondition",
            Phase::Create => "create",
            Phase::Recover => "recover",
            Phase::Update => "update",
            Phase::Delete => "delete",
            Phase::Purge => "purge",
            Phase::Poll => "poll",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The resource does not exist remotely. Never cached.
    #[error("{phase}: {resource} was not found")]
    NotFound { resource: String, phase: Phase },

    /// The remote call succeeded but a field this crate depends on was missing
    #[error("{resource}: response did not contain `{field}`")]
    MalformedResponse {
        resource: String,
        field: &'static str,
    },

    /// Create requested for a resource that is already active
    #[error(
        "{resource} already exists - it needs to be imported into state, or re-use of existing resources enabled"
    )]
    AlreadyExists { resource: String },

    /// A soft-deleted resource blocks creation and automatic recovery is disabled
    #[error(
        "an existing soft-deleted resource blocks creating {resource}, however automatic recovery has been disabled. \
         Enable recovery of soft-deleted resources, recover it manually and import it, or pick a different name"
    )]
    RequiresManualRecovery { resource: String },

    /// Purge requested against a resource with purge protection enabled
    #[error("{resource} has purge protection enabled and cannot be purged until its retention period elapses")]
    PurgeNotPermitted { resource: String },

    /// A polling loop exceeded its deadline without observing the target state
    #[error("{phase}: timed out after {timeout:?} waiting for {resource} to become {target}")]
    Timeout {
        resource: String,
        phase: Phase,
        target: String,
        timeout: Duration,
    },

    /// Any other failure propagated from the backing API
    #[error("{phase}: {resource}: {source}")]
    Remote {
        resource: String,
        phase: Phase,
        #[source]
        source: ApiError,
    },

    /// An identifier or address could not be parsed
    #[error("parsing {input:?}: {reason}")]
    InvalidId { input: String, reason: String },
}

impl Error {
    pub(crate) fn remote(resource: impl fmt::Display, phase: Phase, source: ApiError) -> Self {
        Error::Remote {
            resource: resource.to_string(),
            phase,
            source,
        }
    }

    pub(crate) fn invalid_id(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidId {
            input: input.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Remote { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Phase the error was raised in, when it carries one
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::NotFound { phase, .. }
            | Error::Timeout { phase, .. }
            | Error::Remote { phase, .. } => Some(*phase),
            Error::AlreadyExists { .. } | Error::RequiresManualRecovery { .. } => {
                Some(Phase::Precondition)
            }
            Error::PurgeNotPermitted { .. } => Some(Phase::Purge),
            Error::MalformedResponse { .. } | Error::InvalidId { .. } => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
