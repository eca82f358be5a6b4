//! Collector error taxonomy.
//!
//! Only two failure classes ever reach the caller of `collect()`: a broken
//! identity bootstrap and a failed target listing. Everything below that is
//! logged and isolated at its own scope.

use thiserror::Error;

use crate::runtime::ClientError;
use crate::store::StoreError;

/// Errors surfaced by [`collect`](crate::collector::DockerCollector::collect).
#[derive(Debug, Error)]
pub enum CollectError {
    /// Identity lookup or insert failed during first-time registration.
    /// Unrecoverable: without an identity no run summary can be attributed.
    #[error("collector registration failed: {0}")]
    Registration(#[source] StoreError),

    /// The target list could not be loaded; the whole cycle is skipped.
    #[error("failed to list targets: {0}")]
    ListTargets(#[source] StoreError),
}

/// Per-target failures. Logged by the cycle loop, never propagated past it.
#[derive(Debug, Error)]
pub enum TargetError {
    /// A required connection option is absent from the target's options map.
    #[error("target '{target}' is missing required option '{key}'")]
    MissingOption { target: String, key: String },

    /// The remote client could not be instantiated.
    #[error("target '{target}' client setup failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: ClientError,
    },

    /// The remote endpoint did not answer the liveness check.
    #[error("target '{target}' ping failed: {source}")]
    Ping {
        target: String,
        #[source]
        source: ClientError,
    },
}
