//! Docker Engine API wire models.
//!
//! Shapes mirror the JSON returned by the Engine REST API. Inventory records
//! are persisted verbatim as documents, so every struct is both `Deserialize`
//! (wire) and `Serialize` (storage). Unknown fields are ignored and missing
//! optional fields default, since the API surface varies across versions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Result of the `_ping` liveness check.
///
/// The Engine reports its negotiated API version and host OS in response
/// headers rather than the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingInfo {
    /// Value of the `Api-Version` header.
    pub api_version: String,
    /// Value of the `Ostype` header (e.g. "linux").
    pub os_type: String,
}

/// A container as listed by `GET /containers/json`.
///
/// Natural key: [`Container::id`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: Vec<String>,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "ImageID", default)]
    pub image_id: String,
    #[serde(rename = "Command", default)]
    pub command: String,
    /// Creation time as unix seconds.
    #[serde(rename = "Created", default)]
    pub created: i64,
    #[serde(rename = "Ports", default)]
    pub ports: Vec<ContainerPort>,
    #[serde(rename = "Labels", default)]
    pub labels: BTreeMap<String, String>,
    /// Lifecycle state (e.g. "running", "exited").
    #[serde(rename = "State", default)]
    pub state: String,
    /// Human-readable status (e.g. "Up 2 hours").
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "HostConfig", default)]
    pub host_config: HostConfig,
    #[serde(rename = "NetworkSettings", default)]
    pub network_settings: NetworkSettings,
    #[serde(rename = "Mounts", default)]
    pub mounts: Vec<Mount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerPort {
    #[serde(rename = "PrivatePort", default)]
    pub private_port: u16,
    #[serde(rename = "PublicPort", default, skip_serializing_if = "Option::is_none")]
    pub public_port: Option<u16>,
    #[serde(rename = "Type", default)]
    pub protocol: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(rename = "NetworkMode", default)]
    pub network_mode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Endpoint settings keyed by network name.
    #[serde(rename = "Networks", default)]
    pub networks: BTreeMap<String, EndpointSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointSettings {
    #[serde(rename = "NetworkID", default)]
    pub network_id: String,
    #[serde(rename = "EndpointID", default)]
    pub endpoint_id: String,
    #[serde(rename = "Gateway", default)]
    pub gateway: String,
    #[serde(rename = "IPAddress", default)]
    pub ip_address: String,
    #[serde(rename = "IPPrefixLen", default)]
    pub ip_prefix_len: u8,
    #[serde(rename = "MacAddress", default)]
    pub mac_address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mount {
    #[serde(rename = "Type", default)]
    pub mount_type: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Source", default)]
    pub source: String,
    #[serde(rename = "Destination", default)]
    pub destination: String,
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "Mode", default)]
    pub mode: String,
    #[serde(rename = "RW", default)]
    pub rw: bool,
    #[serde(rename = "Propagation", default)]
    pub propagation: String,
}

/// A network as listed by `GET /networks`.
///
/// Natural key: [`Network::id`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Created", default)]
    pub created: String,
    #[serde(rename = "Scope", default)]
    pub scope: String,
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "EnableIPv6", default)]
    pub enable_ipv6: bool,
    #[serde(rename = "IPAM", default)]
    pub ipam: Ipam,
    #[serde(rename = "Internal", default)]
    pub internal: bool,
    #[serde(rename = "Attachable", default)]
    pub attachable: bool,
    #[serde(rename = "Ingress", default)]
    pub ingress: bool,
    #[serde(rename = "Labels", default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ipam {
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "Config", default)]
    pub config: Vec<IpamConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpamConfig {
    #[serde(rename = "Subnet", default)]
    pub subnet: String,
    #[serde(rename = "Gateway", default)]
    pub gateway: String,
}

/// Response of `GET /volumes`: volumes plus driver warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeList {
    #[serde(rename = "Volumes", default)]
    pub volumes: Vec<Volume>,
    #[serde(rename = "Warnings", default)]
    pub warnings: Vec<String>,
}

/// A volume. Natural key: [`Volume::name`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volume {
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "Mountpoint", default)]
    pub mountpoint: String,
    #[serde(rename = "Labels", default)]
    pub labels: BTreeMap<String, String>,
    #[serde(rename = "Scope", default)]
    pub scope: String,
    #[serde(rename = "Options", default)]
    pub options: BTreeMap<String, String>,
}

/// A single-sample stats payload from `GET /containers/{id}/stats?stream=false`.
///
/// Unlike inventory endpoints the stats fields are snake_case on the wire.
/// Keyed by the container id the sample was requested for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerStats {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Sample timestamp (RFC3339).
    #[serde(default)]
    pub read: String,
    #[serde(default)]
    pub pids_stats: PidsStats,
    #[serde(default)]
    pub cpu_stats: CpuStats,
    #[serde(default)]
    pub precpu_stats: CpuStats,
    #[serde(default)]
    pub memory_stats: MemoryStats,
    /// Per-interface network counters.
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PidsStats {
    #[serde(default)]
    pub current: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuStats {
    #[serde(default)]
    pub cpu_usage: CpuUsage,
    #[serde(default)]
    pub system_cpu_usage: u64,
    #[serde(default)]
    pub online_cpus: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuUsage {
    #[serde(default)]
    pub total_usage: u64,
    #[serde(default)]
    pub usage_in_kernelmode: u64,
    #[serde(default)]
    pub usage_in_usermode: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    #[serde(default)]
    pub usage: u64,
    #[serde(default)]
    pub max_usage: u64,
    #[serde(default)]
    pub limit: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    #[serde(default)]
    pub rx_bytes: u64,
    #[serde(default)]
    pub rx_packets: u64,
    #[serde(default)]
    pub tx_bytes: u64,
    #[serde(default)]
    pub tx_packets: u64,
}
