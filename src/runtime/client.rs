//! Remote runtime client capability traits.

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

use crate::model::{Container, Network, PingInfo, Volume};

/// Errors produced by the remote runtime client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote endpoint answered with a non-success status.
    #[error("unexpected status {status} from {endpoint}")]
    Status {
        status: u16,
        endpoint: String,
    },

    /// Response payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid connection parameters.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// A raw response payload, consumed chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Opens a client bound to one remote endpoint.
///
/// A fresh client is created per target per cycle; implementations must not
/// assume reuse across cycles.
#[async_trait::async_trait]
pub trait RuntimeConnector: Send + Sync {
    type Client: RuntimeClient;

    /// Bind a client to `(host, api_version)` with an optional port.
    async fn connect(
        &self,
        host: &str,
        api_version: &str,
        port: Option<u16>,
    ) -> Result<Self::Client, ClientError>;
}

/// Typed surface of one remote Docker Engine endpoint.
#[async_trait::async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Liveness check. Returns the negotiated API version and host OS.
    async fn ping(&self) -> Result<PingInfo, ClientError>;

    /// List all containers, running or not.
    async fn list_containers(&self) -> Result<Vec<Container>, ClientError>;

    /// Open the single-sample stats payload for one container.
    ///
    /// The returned stream must be fully consumed and dropped by the caller
    /// whether or not decoding succeeds.
    async fn stats_stream(&self, container_id: &str) -> Result<ByteStream, ClientError>;

    /// List networks.
    async fn list_networks(&self) -> Result<Vec<Network>, ClientError>;

    /// List volumes. Driver warnings are returned alongside, not as errors.
    async fn list_volumes(&self) -> Result<(Vec<Volume>, Vec<String>), ClientError>;
}
