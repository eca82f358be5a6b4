//! Docker Engine API adapter over HTTP.
//!
//! Talks to a remote Engine at `http://{host}:{port}/v{apiVersion}/...`.
//! Connection-level timeouts live here; the orchestrator never re-specifies
//! them.

use std::time::Duration;

use futures::TryStreamExt;
use reqwest::{Client, Response, StatusCode};

use crate::model::{Container, Network, PingInfo, Volume, VolumeList};
use crate::runtime::client::{ByteStream, ClientError, RuntimeClient, RuntimeConnector};

/// Default Engine API port for unencrypted TCP.
const DEFAULT_PORT: u16 = 2375;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connector producing [`DockerClient`]s bound to one endpoint each.
#[derive(Debug, Clone)]
pub struct DockerConnector {
    timeout: Duration,
}

impl DockerConnector {
    /// Create a connector with the default request timeout.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for DockerConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RuntimeConnector for DockerConnector {
    type Client = DockerClient;

    async fn connect(
        &self,
        host: &str,
        api_version: &str,
        port: Option<u16>,
    ) -> Result<Self::Client, ClientError> {
        DockerClient::new(host, api_version, port, self.timeout)
    }
}

/// Client bound to one Docker Engine endpoint for the duration of one
/// target's collection pass.
pub struct DockerClient {
    http: Client,
    base_url: String,
}

impl DockerClient {
    fn new(
        host: &str,
        api_version: &str,
        port: Option<u16>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        if host.is_empty() {
            return Err(ClientError::InvalidEndpoint("empty host".to_string()));
        }
        if api_version.is_empty() {
            return Err(ClientError::InvalidEndpoint("empty api version".to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Http)?;

        let port = port.unwrap_or(DEFAULT_PORT);
        let base_url = format!("http://{host}:{port}/v{api_version}");

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_checked(&self, path: &str) -> Result<Response, ClientError> {
        let url = self.endpoint(path);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                endpoint: url,
            });
        }
        Ok(response)
    }

    fn header_string(response: &Response, name: &str) -> String {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait::async_trait]
impl RuntimeClient for DockerClient {
    async fn ping(&self) -> Result<PingInfo, ClientError> {
        let response = self.get_checked("/_ping").await?;
        if response.status() != StatusCode::OK {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                endpoint: self.endpoint("/_ping"),
            });
        }

        Ok(PingInfo {
            api_version: Self::header_string(&response, "Api-Version"),
            os_type: Self::header_string(&response, "Ostype"),
        })
    }

    async fn list_containers(&self) -> Result<Vec<Container>, ClientError> {
        let response = self.get_checked("/containers/json?all=true").await?;
        Ok(response.json().await?)
    }

    async fn stats_stream(&self, container_id: &str) -> Result<ByteStream, ClientError> {
        let response = self
            .get_checked(&format!("/containers/{container_id}/stats?stream=false"))
            .await?;
        Ok(Box::pin(response.bytes_stream().map_err(ClientError::Http)))
    }

    async fn list_networks(&self) -> Result<Vec<Network>, ClientError> {
        let response = self.get_checked("/networks").await?;
        Ok(response.json().await?)
    }

    async fn list_volumes(&self) -> Result<(Vec<Volume>, Vec<String>), ClientError> {
        let response = self.get_checked("/volumes").await?;
        let list: VolumeList = response.json().await?;
        Ok((list.volumes, list.warnings))
    }
}
