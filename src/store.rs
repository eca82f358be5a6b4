//! Persistence layer.
//!
//! Document-style storage over DuckDB: inventory records are kept as JSON
//! documents keyed by their remote-assigned natural identifier and replaced
//! wholesale on every upsert.
//!
//! # Components
//!
//! - [`Sink`]: upsert/query capability trait consumed by the orchestrator
//! - [`DuckdbSink`]: production implementation over an r2d2 pool
//! - [`ConnPool`]: shared connection pool
//! - [`schema`]: DDL and natural-key index creation

pub mod error;
pub mod pool;
pub mod schema;
mod sink;
mod types;

pub use error::StoreError;
pub use pool::ConnPool;
pub use sink::{DuckdbSink, Sink};
pub use types::{
    CollectionError, CollectorIdentity, CollectorType, RunSummary, Target, OPTION_API_VERSION,
    OPTION_HOST, OPTION_PORT,
};
