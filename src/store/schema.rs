//! Database schema definitions.
//!
//! Inventory tables hold the full remote record as a JSON document next to
//! its natural key, replaced wholesale on every upsert.

use duckdb::Connection;

use crate::store::StoreError;

/// Collector identity records, one row per collector name.
pub const COLLECTORS_TABLE_DDL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS collectors_id_seq;
CREATE TABLE IF NOT EXISTS collectors (
    id                    BIGINT PRIMARY KEY DEFAULT NEXTVAL('collectors_id_seq'),
    name                  VARCHAR NOT NULL UNIQUE,
    collector_type        VARCHAR NOT NULL,
    enabled               BOOLEAN NOT NULL DEFAULT true,
    online                BOOLEAN NOT NULL DEFAULT false,
    errors                VARCHAR DEFAULT '[]',
    last_executed         BIGINT NOT NULL DEFAULT 0,
    last_executed_time    VARCHAR,
    last_executed_seconds BIGINT NOT NULL DEFAULT 0,
    record_count          BIGINT NOT NULL DEFAULT 0
);
"#;

/// Configured collection targets (one per remote Docker endpoint).
pub const TARGETS_TABLE_DDL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS targets_id_seq;
CREATE TABLE IF NOT EXISTS targets (
    id           BIGINT PRIMARY KEY DEFAULT NEXTVAL('targets_id_seq'),
    name         VARCHAR NOT NULL UNIQUE,
    description  VARCHAR,
    enabled      BOOLEAN NOT NULL DEFAULT true,
    options      VARCHAR NOT NULL DEFAULT '{}',
    last_updated BIGINT NOT NULL DEFAULT 0
);
"#;

/// Inventory tables, keyed by the remote-assigned natural identifier.
pub const INVENTORY_TABLES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS containers (
    id         VARCHAR NOT NULL,
    document   VARCHAR NOT NULL,
    updated_at BIGINT NOT NULL
);
CREATE TABLE IF NOT EXISTS container_stats (
    container_id VARCHAR NOT NULL,
    document     VARCHAR NOT NULL,
    updated_at   BIGINT NOT NULL
);
CREATE TABLE IF NOT EXISTS networks (
    id         VARCHAR NOT NULL,
    document   VARCHAR NOT NULL,
    updated_at BIGINT NOT NULL
);
CREATE TABLE IF NOT EXISTS volumes (
    name       VARCHAR NOT NULL,
    document   VARCHAR NOT NULL,
    updated_at BIGINT NOT NULL
);
"#;

/// Initialize the database schema.
///
/// Creates all tables if they don't exist. Unique indexes on the inventory
/// natural keys are created separately (see [`ensure_unique_indexes`]) so
/// their failure can be tolerated per the registration contract.
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(COLLECTORS_TABLE_DDL)?;
    conn.execute_batch(TARGETS_TABLE_DDL)?;
    conn.execute_batch(INVENTORY_TABLES_DDL)?;

    tracing::info!("Database schema initialized");
    Ok(())
}

/// Create the unique indexes that make inventory upserts idempotent.
///
/// Idempotent itself; safe to call on every registration.
pub fn ensure_unique_indexes(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS containers_id_idx ON containers (id);
        CREATE UNIQUE INDEX IF NOT EXISTS container_stats_id_idx ON container_stats (container_id);
        CREATE UNIQUE INDEX IF NOT EXISTS networks_id_idx ON networks (id);
        CREATE UNIQUE INDEX IF NOT EXISTS volumes_name_idx ON volumes (name);
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initialization() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        for table in ["collectors", "targets", "containers", "container_stats", "networks", "volumes"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_ensure_unique_indexes_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        ensure_unique_indexes(&conn).unwrap();
        ensure_unique_indexes(&conn).unwrap();

        // Duplicate natural keys must now be rejected on plain insert.
        conn.execute(
            "INSERT INTO containers (id, document, updated_at) VALUES ('c1', '{}', 0)",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO containers (id, document, updated_at) VALUES ('c1', '{}', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_collector_name_unique() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO collectors (name, collector_type) VALUES ('docker', 'docker')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO collectors (name, collector_type) VALUES ('docker', 'docker')",
            [],
        );
        assert!(result.is_err());
    }
}
