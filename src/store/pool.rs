//! Connection pool over duckdb using r2d2.

use std::path::Path;
use std::sync::Arc;

use duckdb::DuckdbConnectionManager;
use r2d2::{Pool, PooledConnection};

use crate::store::StoreError;

/// Connection pool shared by all store facades.
///
/// DuckDB connections produced by the manager are clones of one underlying
/// database instance, so writes are immediately visible to every handle.
pub struct ConnPool {
    pool: Pool<DuckdbConnectionManager>,
}

impl ConnPool {
    /// Open a file-backed pool.
    pub fn open(db_path: &Path, size: u32) -> Result<Arc<Self>, StoreError> {
        let manager = DuckdbConnectionManager::file(db_path)?;
        let pool = Pool::builder().max_size(size).build(manager)?;
        Ok(Arc::new(Self { pool }))
    }

    /// Open an in-memory pool. Used by tests and ephemeral runs.
    pub fn open_in_memory(size: u32) -> Result<Arc<Self>, StoreError> {
        let manager = DuckdbConnectionManager::memory()?;
        let pool = Pool::builder().max_size(size).build(manager)?;
        Ok(Arc::new(Self { pool }))
    }

    /// Get a connection from the pool.
    pub fn get(&self) -> Result<PooledConnection<DuckdbConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::init_schema;
    use tempfile::tempdir;

    #[test]
    fn test_pool_file_backed() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let pool = ConnPool::open(&db_path, 2).unwrap();
        init_schema(&pool.get().unwrap()).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'collectors'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_pool_shares_in_memory_database() {
        let pool = ConnPool::open_in_memory(2).unwrap();
        init_schema(&pool.get().unwrap()).unwrap();

        // A second pooled connection must see tables created via the first.
        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'targets'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
