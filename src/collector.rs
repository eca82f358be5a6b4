//! Inventory collection.
//!
//! [`DockerCollector`] owns the whole collection lifecycle: one-time
//! self-registration against the store, the per-target collection protocol,
//! and run summary bookkeeping. Submodules hold the error taxonomy and the
//! streamed stats decoder.

pub mod error;
mod orchestrator;
mod stats;

pub use error::{CollectError, TargetError};
pub use orchestrator::{CycleReport, DockerCollector, TargetFailure};
pub use stats::decode_stats;
