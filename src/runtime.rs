//! Remote runtime client.
//!
//! The orchestrator talks to remote Docker Engines through the
//! [`RuntimeConnector`] / [`RuntimeClient`] traits so tests can substitute
//! scripted fakes. [`DockerConnector`] is the production HTTP adapter.

pub mod client;
pub mod docker;

pub use client::{ByteStream, ClientError, RuntimeClient, RuntimeConnector};
pub use docker::{DockerClient, DockerConnector};
