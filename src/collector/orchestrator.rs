//! Collection orchestrator.
//!
//! Drives one collection cycle per [`DockerCollector::collect`] call: ensures
//! the one-time self-registration, walks the configured targets in order,
//! and writes the run summary at the end. Failures are isolated per target
//! and per sub-resource; only a broken registration or target listing ever
//! reaches the caller.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::collector::error::{CollectError, TargetError};
use crate::collector::stats::decode_stats;
use crate::runtime::{ClientError, RuntimeClient, RuntimeConnector};
use crate::store::{
    CollectorIdentity, RunSummary, Sink, StoreError, Target, OPTION_API_VERSION, OPTION_HOST,
    OPTION_PORT,
};

/// Registration state of the orchestrator's identity.
///
/// The transition happens at most once per process lifetime. Holding the
/// mutex during the lookup/insert is the "registering" state: concurrent
/// first calls block on it and adopt the id the winner stored.
enum Registration {
    Unregistered,
    Registered(i64),
}

/// Outcome of one collection cycle.
///
/// Per-target failures are collected here as values instead of unwinding,
/// so a partially failed cycle still completes and is still summarized.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Enabled targets that were attempted.
    pub attempted: usize,
    /// Disabled targets that were skipped without contact.
    pub skipped: usize,
    /// Records collected and persisted this cycle.
    pub records: i64,
    /// Targets whose collection pass failed outright.
    pub failures: Vec<TargetFailure>,
}

/// A failed per-target collection pass.
#[derive(Debug, Clone)]
pub struct TargetFailure {
    /// Target name.
    pub target: String,
    /// Rendered failure cause.
    pub error: String,
}

#[derive(Debug, Error)]
enum StatsError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The collection orchestrator.
///
/// Generic over its two collaborators so tests can run against in-memory
/// fakes: a [`Sink`] for persistence and a [`RuntimeConnector`] for remote
/// Docker Engine access.
pub struct DockerCollector<S, C> {
    name: String,
    sink: Arc<S>,
    connector: C,
    registration: tokio::sync::Mutex<Registration>,
}

impl<S, C> DockerCollector<S, C>
where
    S: Sink,
    C: RuntimeConnector,
{
    /// Create an orchestrator with the given collector name.
    pub fn new(name: impl Into<String>, sink: Arc<S>, connector: C) -> Self {
        Self {
            name: name.into(),
            sink,
            connector,
            registration: tokio::sync::Mutex::new(Registration::Unregistered),
        }
    }

    /// The configured collector name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one collection cycle over all configured targets.
    ///
    /// Returns an error only when registration fails (fatal) or the target
    /// list cannot be loaded (cycle skipped). Every other failure is logged,
    /// recorded in the returned [`CycleReport`], and does not stop the cycle.
    pub async fn collect(&self) -> Result<CycleReport, CollectError> {
        let started = Instant::now();

        let collector_id = self.ensure_registered().await?;

        let targets = self
            .sink
            .list_targets()
            .await
            .map_err(CollectError::ListTargets)?;
        tracing::debug!(count = targets.len(), "Loaded targets");

        let mut report = CycleReport::default();
        for target in &targets {
            if !target.enabled {
                tracing::debug!(target = %target.name, "Skipping disabled target");
                report.skipped += 1;
                continue;
            }

            report.attempted += 1;
            match self.collect_target(target).await {
                Ok(records) => {
                    tracing::info!(target = %target.name, records, "Target collected");
                    report.records += records;
                }
                Err(e) => {
                    tracing::error!(target = %target.name, error = %e, "Target collection failed");
                    report.failures.push(TargetFailure {
                        target: target.name.clone(),
                        error: e.to_string(),
                    });
                }
            }

            // Stamp the attempt whether it succeeded or not.
            if let Some(target_id) = target.id {
                if let Err(e) = self.sink.touch_target_updated(target_id).await {
                    tracing::warn!(target = %target.name, error = %e,
                        "Failed to stamp target last-updated");
                }
            }
        }

        let summary = RunSummary {
            duration: started.elapsed(),
            records: report.records,
        };
        if let Err(e) = self
            .sink
            .update_identity_summary(collector_id, &summary)
            .await
        {
            tracing::warn!(error = %e, "Failed to write run summary");
        }

        tracing::info!(
            attempted = report.attempted,
            skipped = report.skipped,
            failed = report.failures.len(),
            records = report.records,
            duration_ms = summary.duration.as_millis() as u64,
            "Collection cycle complete"
        );
        Ok(report)
    }

    /// Ensure the identity record exists and adopt its id.
    ///
    /// Idempotent across process restarts: an existing record for this name
    /// is adopted without an insert. A lookup or insert error is fatal.
    async fn ensure_registered(&self) -> Result<i64, CollectError> {
        let mut registration = self.registration.lock().await;
        if let Registration::Registered(id) = *registration {
            return Ok(id);
        }

        let id = match self
            .sink
            .find_identity_by_name(&self.name)
            .await
            .map_err(CollectError::Registration)?
        {
            Some(identity) => {
                let id = identity.id.ok_or_else(|| {
                    CollectError::Registration(StoreError::Internal(
                        "identity record has no id".to_string(),
                    ))
                })?;
                tracing::info!(collector = %self.name, id, "Adopted existing collector identity");
                id
            }
            None => {
                let id = self
                    .sink
                    .insert_identity(&CollectorIdentity::new(&self.name))
                    .await
                    .map_err(CollectError::Registration)?;
                tracing::info!(collector = %self.name, id, "Registered collector identity");
                id
            }
        };

        // Non-fatal: until the indexes exist the conflict targets are
        // missing, so inventory upserts fail (isolated and logged) and the
        // documents land on a later cycle.
        if let Err(e) = self.sink.ensure_unique_indexes().await {
            tracing::warn!(error = %e, "Failed to ensure inventory indexes");
        }

        *registration = Registration::Registered(id);
        Ok(id)
    }

    /// Run the collection protocol against one target.
    ///
    /// Containers, per-container stats, networks and volumes are fetched
    /// independently: a failure in one is logged and never blocks the
    /// others. Returns the number of records persisted for this target.
    async fn collect_target(&self, target: &Target) -> Result<i64, TargetError> {
        let host = require_option(target, OPTION_HOST)?;
        let api_version = require_option(target, OPTION_API_VERSION)?;
        let port = target.option(OPTION_PORT).and_then(|p| p.parse().ok());

        let client = self
            .connector
            .connect(host, api_version, port)
            .await
            .map_err(|source| TargetError::Connect {
                target: target.name.clone(),
                source,
            })?;

        let ping = client.ping().await.map_err(|source| TargetError::Ping {
            target: target.name.clone(),
            source,
        })?;
        tracing::debug!(
            target = %target.name,
            api_version = %ping.api_version,
            os_type = %ping.os_type,
            "Target reachable"
        );

        let mut records = 0i64;

        let containers = match client.list_containers().await {
            Ok(containers) => {
                match self.sink.upsert_containers(&containers).await {
                    Ok(()) => records += containers.len() as i64,
                    Err(e) => {
                        tracing::error!(target = %target.name, error = %e,
                            "Container upsert failed");
                    }
                }
                containers
            }
            Err(e) => {
                tracing::error!(target = %target.name, error = %e, "Container listing failed");
                Vec::new()
            }
        };

        for container in &containers {
            match self.collect_container_stats(&client, &container.id).await {
                Ok(()) => records += 1,
                Err(e) => {
                    tracing::error!(target = %target.name, container = %container.id,
                        error = %e, "Stats collection failed");
                }
            }
        }

        match client.list_networks().await {
            Ok(networks) => match self.sink.upsert_networks(&networks).await {
                Ok(()) => records += networks.len() as i64,
                Err(e) => {
                    tracing::error!(target = %target.name, error = %e, "Network upsert failed");
                }
            },
            Err(e) => {
                tracing::error!(target = %target.name, error = %e, "Network listing failed");
            }
        }

        match client.list_volumes().await {
            Ok((volumes, warnings)) => {
                if !warnings.is_empty() {
                    tracing::warn!(target = %target.name, warnings = ?warnings,
                        "Volume listing returned warnings");
                }
                match self.sink.upsert_volumes(&volumes).await {
                    Ok(()) => records += volumes.len() as i64,
                    Err(e) => {
                        tracing::error!(target = %target.name, error = %e, "Volume upsert failed");
                    }
                }
            }
            Err(e) => {
                tracing::error!(target = %target.name, error = %e, "Volume listing failed");
            }
        }

        Ok(records)
    }

    /// Fetch, decode and persist one container's stats sample.
    async fn collect_container_stats<R: RuntimeClient>(
        &self,
        client: &R,
        container_id: &str,
    ) -> Result<(), StatsError> {
        let stream = client.stats_stream(container_id).await?;
        let stats = decode_stats(stream).await?;
        self.sink.upsert_container_stats(container_id, &stats).await?;
        Ok(())
    }
}

fn require_option<'a>(target: &'a Target, key: &str) -> Result<&'a str, TargetError> {
    target.option(key).ok_or_else(|| TargetError::MissingOption {
        target: target.name.clone(),
        key: key.to_string(),
    })
}
