//! Persistence sink: the upsert/query surface consumed by the orchestrator.
//!
//! [`Sink`] is the capability trait; [`DuckdbSink`] is the production
//! implementation. Inventory upserts are replace-whole-document: the record
//! is serialized to JSON and swapped in full against its natural key.

use std::sync::Arc;

use chrono::Utc;
use duckdb::params;

use crate::model::{Container, ContainerStats, Network, Volume};
use crate::store::pool::ConnPool;
use crate::store::schema;
use crate::store::types::{CollectionError, CollectorIdentity, RunSummary, Target};
use crate::store::StoreError;

/// Upsert/query contract of the persistence layer.
///
/// Abstracted so orchestrator tests can substitute an in-memory fake without
/// a live database.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    /// Ensure the natural-key unique indexes required for upsert idempotence.
    async fn ensure_unique_indexes(&self) -> Result<(), StoreError>;

    /// Look up an identity record by collector name.
    ///
    /// Not-found is `Ok(None)`, never an error.
    async fn find_identity_by_name(&self, name: &str) -> Result<Option<CollectorIdentity>, StoreError>;

    /// Insert a new identity record, returning its assigned id.
    async fn insert_identity(&self, identity: &CollectorIdentity) -> Result<i64, StoreError>;

    /// Write the end-of-cycle run summary into the identity record.
    ///
    /// Adds `summary.records` to the cumulative record counter.
    async fn update_identity_summary(&self, id: i64, summary: &RunSummary) -> Result<(), StoreError>;

    /// Load all configured targets in deterministic (id) order.
    async fn list_targets(&self) -> Result<Vec<Target>, StoreError>;

    /// Stamp a target's last-updated time after a collection attempt.
    async fn touch_target_updated(&self, target_id: i64) -> Result<(), StoreError>;

    /// Insert a target unless one with the same name exists.
    ///
    /// Returns the new id, or `None` if the target already existed.
    async fn insert_target_if_missing(&self, target: &Target) -> Result<Option<i64>, StoreError>;

    /// Upsert containers keyed by container id.
    async fn upsert_containers(&self, containers: &[Container]) -> Result<(), StoreError>;

    /// Upsert a single stats sample keyed by container id.
    async fn upsert_container_stats(
        &self,
        container_id: &str,
        stats: &ContainerStats,
    ) -> Result<(), StoreError>;

    /// Upsert networks keyed by network id.
    async fn upsert_networks(&self, networks: &[Network]) -> Result<(), StoreError>;

    /// Upsert volumes keyed by volume name.
    async fn upsert_volumes(&self, volumes: &[Volume]) -> Result<(), StoreError>;
}

/// DuckDB-backed sink.
#[derive(Clone)]
pub struct DuckdbSink {
    pool: Arc<ConnPool>,
}

impl DuckdbSink {
    /// Create a sink over an initialized pool.
    pub fn new(pool: Arc<ConnPool>) -> Self {
        Self { pool }
    }

    fn upsert_documents<I, K>(&self, sql: &str, rows: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = (K, String)>,
        K: AsRef<str>,
    {
        let mut conn = self.pool.get()?;
        let now = Utc::now().timestamp();

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(sql)?;
            for (key, document) in rows {
                stmt.execute(params![key.as_ref(), document, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

const UPSERT_CONTAINER_SQL: &str = r#"
    INSERT INTO containers (id, document, updated_at) VALUES (?, ?, ?)
    ON CONFLICT (id) DO UPDATE SET
        document = EXCLUDED.document,
        updated_at = EXCLUDED.updated_at
"#;

const UPSERT_STATS_SQL: &str = r#"
    INSERT INTO container_stats (container_id, document, updated_at) VALUES (?, ?, ?)
    ON CONFLICT (container_id) DO UPDATE SET
        document = EXCLUDED.document,
        updated_at = EXCLUDED.updated_at
"#;

const UPSERT_NETWORK_SQL: &str = r#"
    INSERT INTO networks (id, document, updated_at) VALUES (?, ?, ?)
    ON CONFLICT (id) DO UPDATE SET
        document = EXCLUDED.document,
        updated_at = EXCLUDED.updated_at
"#;

const UPSERT_VOLUME_SQL: &str = r#"
    INSERT INTO volumes (name, document, updated_at) VALUES (?, ?, ?)
    ON CONFLICT (name) DO UPDATE SET
        document = EXCLUDED.document,
        updated_at = EXCLUDED.updated_at
"#;

#[async_trait::async_trait]
impl Sink for DuckdbSink {
    async fn ensure_unique_indexes(&self) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        schema::ensure_unique_indexes(&conn)
    }

    async fn find_identity_by_name(&self, name: &str) -> Result<Option<CollectorIdentity>, StoreError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, name, collector_type, enabled, online, errors,
                    last_executed, last_executed_time, last_executed_seconds, record_count
             FROM collectors WHERE name = ?",
            params![name],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, i64>(9)?,
                ))
            },
        );

        // A row that exists but cannot be decoded is corrupt state, not a
        // miss; surface it instead of papering over with defaults.
        match result {
            Ok((
                id,
                name,
                type_tag,
                enabled,
                online,
                errors_json,
                last_executed,
                last_executed_time,
                last_executed_seconds,
                record_count,
            )) => {
                let collector_type = type_tag.parse().map_err(|_| {
                    StoreError::Internal(format!("unknown collector type tag '{type_tag}'"))
                })?;
                let errors: Vec<CollectionError> = serde_json::from_str(&errors_json)?;
                Ok(Some(CollectorIdentity {
                    id: Some(id),
                    name,
                    collector_type,
                    enabled,
                    online,
                    errors,
                    last_executed,
                    last_executed_time,
                    last_executed_seconds,
                    record_count,
                }))
            }
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::from(e)),
        }
    }

    async fn insert_identity(&self, identity: &CollectorIdentity) -> Result<i64, StoreError> {
        let conn = self.pool.get()?;
        let errors_json = serde_json::to_string(&identity.errors)?;

        let id: i64 = conn.query_row(
            "INSERT INTO collectors
                 (name, collector_type, enabled, online, errors,
                  last_executed, last_executed_time, last_executed_seconds, record_count)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
            params![
                identity.name,
                identity.collector_type.as_ref(),
                identity.enabled,
                identity.online,
                errors_json,
                identity.last_executed,
                identity.last_executed_time,
                identity.last_executed_seconds,
                identity.record_count,
            ],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    async fn update_identity_summary(&self, id: i64, summary: &RunSummary) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        let now = Utc::now();

        conn.execute(
            "UPDATE collectors SET
                 online = true,
                 last_executed = ?,
                 last_executed_time = ?,
                 last_executed_seconds = ?,
                 record_count = record_count + ?
             WHERE id = ?",
            params![
                now.timestamp(),
                now.to_rfc3339(),
                summary.duration.as_secs() as i64,
                summary.records,
                id,
            ],
        )?;

        Ok(())
    }

    async fn list_targets(&self) -> Result<Vec<Target>, StoreError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, description, enabled, options, last_updated
             FROM targets ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut targets = Vec::with_capacity(rows.len());
        for (id, name, description, enabled, options_json, last_updated) in rows {
            let options = serde_json::from_str(&options_json)?;
            targets.push(Target {
                id: Some(id),
                name,
                description,
                enabled,
                options,
                last_updated,
            });
        }
        Ok(targets)
    }

    async fn touch_target_updated(&self, target_id: i64) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE targets SET last_updated = ? WHERE id = ?",
            params![Utc::now().timestamp(), target_id],
        )?;
        Ok(())
    }

    async fn insert_target_if_missing(&self, target: &Target) -> Result<Option<i64>, StoreError> {
        let conn = self.pool.get()?;

        let existing = conn.query_row(
            "SELECT id FROM targets WHERE name = ?",
            params![target.name],
            |row| row.get::<_, i64>(0),
        );
        match existing {
            Ok(_) => return Ok(None),
            Err(duckdb::Error::QueryReturnedNoRows) => {}
            Err(e) => return Err(StoreError::from(e)),
        }

        let options_json = serde_json::to_string(&target.options)?;
        let id: i64 = conn.query_row(
            "INSERT INTO targets (name, description, enabled, options, last_updated)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
            params![
                target.name,
                target.description,
                target.enabled,
                options_json,
                target.last_updated,
            ],
            |row| row.get(0),
        )?;

        Ok(Some(id))
    }

    async fn upsert_containers(&self, containers: &[Container]) -> Result<(), StoreError> {
        let rows = containers
            .iter()
            .map(|c| Ok((c.id.clone(), serde_json::to_string(c)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.upsert_documents(UPSERT_CONTAINER_SQL, rows)?;

        tracing::debug!(count = containers.len(), "Containers upserted");
        Ok(())
    }

    async fn upsert_container_stats(
        &self,
        container_id: &str,
        stats: &ContainerStats,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_string(stats)?;
        self.upsert_documents(UPSERT_STATS_SQL, [(container_id, document)])
    }

    async fn upsert_networks(&self, networks: &[Network]) -> Result<(), StoreError> {
        let rows = networks
            .iter()
            .map(|n| Ok((n.id.clone(), serde_json::to_string(n)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.upsert_documents(UPSERT_NETWORK_SQL, rows)?;

        tracing::debug!(count = networks.len(), "Networks upserted");
        Ok(())
    }

    async fn upsert_volumes(&self, volumes: &[Volume]) -> Result<(), StoreError> {
        let rows = volumes
            .iter()
            .map(|v| Ok((v.name.clone(), serde_json::to_string(v)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.upsert_documents(UPSERT_VOLUME_SQL, rows)?;

        tracing::debug!(count = volumes.len(), "Volumes upserted");
        Ok(())
    }
}
