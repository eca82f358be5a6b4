//! Dockwatch - Docker inventory collector.
//!
//! Polls remote Docker Engine endpoints on a schedule and keeps a local
//! inventory of their containers, container stats, networks and volumes,
//! along with per-run collector metadata.
//!
//! # Architecture
//!
//! - **Collector**: the cycle orchestrator, generic over its store and
//!   remote-client seams
//! - **Runtime**: HTTP adapter for the Docker Engine API
//! - **Store**: DuckDB-backed document persistence with natural-key upserts
//! - **Config**: YAML configuration and target seeding
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dockwatch::{ConnPool, DockerCollector, DockerConnector, DuckdbSink};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ConnPool::open("dockwatch.db".as_ref(), 4)?;
//! let conn = pool.get()?;
//! dockwatch::store::schema::init_schema(&conn)?;
//!
//! let sink = Arc::new(DuckdbSink::new(pool));
//! let collector = DockerCollector::new("dockwatch", sink, DockerConnector::new());
//! let report = collector.collect().await?;
//! println!("collected {} records", report.records);
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod model;
pub mod runtime;
pub mod store;

pub use collector::{CollectError, CycleReport, DockerCollector, TargetFailure};
pub use config::{AppConfig, ConfigError};
pub use runtime::{DockerClient, DockerConnector, RuntimeClient, RuntimeConnector};
pub use store::{ConnPool, DuckdbSink, Sink, StoreError, Target};
