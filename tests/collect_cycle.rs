//! Collection cycle integration tests.
//!
//! Exercises the orchestrator end to end against scripted in-memory fakes
//! for both seams: the persistence sink and the remote runtime connector.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use dockwatch::collector::{CollectError, DockerCollector};
use dockwatch::model::{Container, ContainerStats, Network, PingInfo, Volume};
use dockwatch::runtime::{ByteStream, ClientError, RuntimeClient, RuntimeConnector};
use dockwatch::store::{CollectorIdentity, RunSummary, Sink, StoreError, Target};

// =============================================================================
// Fake sink
// =============================================================================

#[derive(Default)]
struct SinkState {
    identities: Vec<CollectorIdentity>,
    next_identity_id: i64,
    targets: Vec<Target>,
    containers: HashMap<String, Container>,
    stats: HashMap<String, ContainerStats>,
    networks: HashMap<String, Network>,
    volumes: HashMap<String, Volume>,
    touched: Vec<i64>,
    summaries: Vec<(i64, RunSummary)>,
    identity_inserts: usize,
    index_calls: usize,
    fail_list_targets: bool,
    fail_upsert_networks: bool,
    fail_identity_lookup: bool,
    fail_identity_insert: bool,
    fail_indexes: bool,
    fail_touch: bool,
    fail_summary: bool,
}

/// In-memory [`Sink`] with per-call failure injection.
#[derive(Default)]
struct FakeSink {
    state: Mutex<SinkState>,
    /// Widens the registration race window when set.
    lookup_delay: Option<Duration>,
}

impl FakeSink {
    fn with_targets(targets: Vec<Target>) -> Self {
        let sink = Self::default();
        {
            let mut state = sink.state.lock().unwrap();
            for (i, mut target) in targets.into_iter().enumerate() {
                target.id = Some(i as i64 + 1);
                state.targets.push(target);
            }
        }
        sink
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.state.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Sink for FakeSink {
    async fn ensure_unique_indexes(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        state.index_calls += 1;
        if state.fail_indexes {
            return Err(StoreError::Internal("index creation broken".to_string()));
        }
        Ok(())
    }

    async fn find_identity_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CollectorIdentity>, StoreError> {
        let delay = self.lookup_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state();
        if state.fail_identity_lookup {
            return Err(StoreError::Internal("identity lookup broken".to_string()));
        }
        Ok(state.identities.iter().find(|i| i.name == name).cloned())
    }

    async fn insert_identity(&self, identity: &CollectorIdentity) -> Result<i64, StoreError> {
        let mut state = self.state();
        if state.fail_identity_insert {
            return Err(StoreError::Internal("identity insert broken".to_string()));
        }
        state.next_identity_id += 1;
        state.identity_inserts += 1;
        let id = state.next_identity_id;
        let mut stored = identity.clone();
        stored.id = Some(id);
        state.identities.push(stored);
        Ok(id)
    }

    async fn update_identity_summary(
        &self,
        id: i64,
        summary: &RunSummary,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.fail_summary {
            return Err(StoreError::Internal("summary write broken".to_string()));
        }
        state.summaries.push((id, *summary));
        Ok(())
    }

    async fn list_targets(&self) -> Result<Vec<Target>, StoreError> {
        let state = self.state();
        if state.fail_list_targets {
            return Err(StoreError::Internal("target listing broken".to_string()));
        }
        Ok(state.targets.clone())
    }

    async fn touch_target_updated(&self, target_id: i64) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.fail_touch {
            return Err(StoreError::Internal("target stamping broken".to_string()));
        }
        state.touched.push(target_id);
        Ok(())
    }

    async fn insert_target_if_missing(&self, target: &Target) -> Result<Option<i64>, StoreError> {
        let mut state = self.state();
        if state.targets.iter().any(|t| t.name == target.name) {
            return Ok(None);
        }
        let id = state.targets.len() as i64 + 1;
        let mut stored = target.clone();
        stored.id = Some(id);
        state.targets.push(stored);
        Ok(Some(id))
    }

    async fn upsert_containers(&self, containers: &[Container]) -> Result<(), StoreError> {
        let mut state = self.state();
        for container in containers {
            state
                .containers
                .insert(container.id.clone(), container.clone());
        }
        Ok(())
    }

    async fn upsert_container_stats(
        &self,
        container_id: &str,
        stats: &ContainerStats,
    ) -> Result<(), StoreError> {
        self.state()
            .stats
            .insert(container_id.to_string(), stats.clone());
        Ok(())
    }

    async fn upsert_networks(&self, networks: &[Network]) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.fail_upsert_networks {
            return Err(StoreError::Internal("network upsert broken".to_string()));
        }
        for network in networks {
            state.networks.insert(network.id.clone(), network.clone());
        }
        Ok(())
    }

    async fn upsert_volumes(&self, volumes: &[Volume]) -> Result<(), StoreError> {
        let mut state = self.state();
        for volume in volumes {
            state.volumes.insert(volume.name.clone(), volume.clone());
        }
        Ok(())
    }
}

// =============================================================================
// Fake runtime
// =============================================================================

/// Scripted remote endpoint, keyed by host in [`FakeConnector`].
#[derive(Clone, Default)]
struct Endpoint {
    ping_fails: bool,
    containers: Vec<Container>,
    networks: Vec<Network>,
    volumes: Vec<Volume>,
    warnings: Vec<String>,
    fail_list_networks: bool,
}

#[derive(Default)]
struct FakeConnector {
    endpoints: HashMap<String, Endpoint>,
    connects: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    fn with_endpoint(mut self, host: &str, endpoint: Endpoint) -> Self {
        self.endpoints.insert(host.to_string(), endpoint);
        self
    }

    /// Handle on the connect log that survives moving the connector into
    /// the orchestrator.
    fn connect_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.connects)
    }
}

#[async_trait::async_trait]
impl RuntimeConnector for FakeConnector {
    type Client = FakeClient;

    async fn connect(
        &self,
        host: &str,
        _api_version: &str,
        _port: Option<u16>,
    ) -> Result<Self::Client, ClientError> {
        self.connects.lock().unwrap().push(host.to_string());
        self.endpoints
            .get(host)
            .cloned()
            .map(|endpoint| FakeClient { endpoint })
            .ok_or_else(|| ClientError::InvalidEndpoint(format!("unknown host {host}")))
    }
}

struct FakeClient {
    endpoint: Endpoint,
}

#[async_trait::async_trait]
impl RuntimeClient for FakeClient {
    async fn ping(&self) -> Result<PingInfo, ClientError> {
        if self.endpoint.ping_fails {
            return Err(ClientError::Status {
                status: 503,
                endpoint: "/_ping".to_string(),
            });
        }
        Ok(PingInfo {
            api_version: "1.43".to_string(),
            os_type: "linux".to_string(),
        })
    }

    async fn list_containers(&self) -> Result<Vec<Container>, ClientError> {
        Ok(self.endpoint.containers.clone())
    }

    async fn stats_stream(&self, container_id: &str) -> Result<ByteStream, ClientError> {
        let stats = ContainerStats {
            id: container_id.to_string(),
            ..Default::default()
        };
        let payload = serde_json::to_vec(&stats)?;
        // Split the payload so decoding has to reassemble chunks.
        let mid = payload.len() / 2;
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&payload[..mid])),
            Ok(Bytes::copy_from_slice(&payload[mid..])),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn list_networks(&self) -> Result<Vec<Network>, ClientError> {
        if self.endpoint.fail_list_networks {
            return Err(ClientError::Status {
                status: 500,
                endpoint: "/networks".to_string(),
            });
        }
        Ok(self.endpoint.networks.clone())
    }

    async fn list_volumes(&self) -> Result<(Vec<Volume>, Vec<String>), ClientError> {
        Ok((self.endpoint.volumes.clone(), self.endpoint.warnings.clone()))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn container(id: &str) -> Container {
    Container {
        id: id.to_string(),
        names: vec![format!("/{id}")],
        image: "redis:7".to_string(),
        state: "running".to_string(),
        ..Default::default()
    }
}

fn network(id: &str, name: &str) -> Network {
    Network {
        id: id.to_string(),
        name: name.to_string(),
        driver: "bridge".to_string(),
        ..Default::default()
    }
}

fn volume(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        driver: "local".to_string(),
        labels: BTreeMap::new(),
        ..Default::default()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_full_cycle_with_mixed_targets() {
    let sink = Arc::new(FakeSink::with_targets(vec![
        Target::new("east", "east.internal", "1.43"),
        Target::new("west", "west.internal", "1.43"),
        Target::new("lab", "lab.internal", "1.40").with_enabled(false),
    ]));
    let connector = FakeConnector::default()
        .with_endpoint(
            "east.internal",
            Endpoint {
                containers: vec![container("c1"), container("c2")],
                networks: vec![network("n1", "bridge")],
                ..Default::default()
            },
        )
        .with_endpoint(
            "west.internal",
            Endpoint {
                ping_fails: true,
                ..Default::default()
            },
        );

    let collector = DockerCollector::new("dockwatch", sink.clone(), connector);
    let report = collector.collect().await.unwrap();

    // 2 containers + 2 stats samples + 1 network, nothing from the failed
    // or disabled targets.
    assert_eq!(report.attempted, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.records, 5);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].target, "west");

    let state = sink.state();
    assert_eq!(state.containers.len(), 2);
    assert_eq!(state.stats.len(), 2);
    assert!(state.stats.contains_key("c1"));
    assert_eq!(state.networks.len(), 1);
    // Both attempted targets were stamped, the disabled one was not.
    assert_eq!(state.touched, vec![1, 2]);
    // One summary for the whole cycle, counting only persisted records.
    assert_eq!(state.summaries.len(), 1);
    assert_eq!(state.summaries[0].1.records, 5);
}

#[tokio::test]
async fn test_disabled_target_is_never_contacted() {
    let sink = Arc::new(FakeSink::with_targets(vec![Target::new(
        "lab",
        "lab.internal",
        "1.40",
    )
    .with_enabled(false)]));
    let connector = FakeConnector::default().with_endpoint("lab.internal", Endpoint::default());
    let connects = connector.connect_log();

    let collector = DockerCollector::new("dockwatch", sink.clone(), connector);
    let report = collector.collect().await.unwrap();

    assert_eq!(report.attempted, 0);
    assert_eq!(report.skipped, 1);
    assert!(connects.lock().unwrap().is_empty());
    assert!(sink.state().touched.is_empty());
}

#[tokio::test]
async fn test_missing_option_isolates_target() {
    let mut broken = Target::new("broken", "10.0.0.9", "1.43");
    broken.options.remove("apiVersion");

    let sink = Arc::new(FakeSink::with_targets(vec![
        broken,
        Target::new("good", "good.internal", "1.43"),
    ]));
    let connector = FakeConnector::default().with_endpoint(
        "good.internal",
        Endpoint {
            containers: vec![container("c9")],
            ..Default::default()
        },
    );

    let collector = DockerCollector::new("dockwatch", sink.clone(), connector);
    let report = collector.collect().await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].target, "broken");
    assert!(report.failures[0].error.contains("apiVersion"));
    // The healthy target still collected.
    assert!(sink.state().containers.contains_key("c9"));
}

#[tokio::test]
async fn test_sub_resource_failure_does_not_block_others() {
    let sink = Arc::new(FakeSink::with_targets(vec![Target::new(
        "east",
        "east.internal",
        "1.43",
    )]));
    let connector = FakeConnector::default().with_endpoint(
        "east.internal",
        Endpoint {
            containers: vec![container("c1")],
            fail_list_networks: true,
            volumes: vec![volume("data")],
            ..Default::default()
        },
    );

    let collector = DockerCollector::new("dockwatch", sink.clone(), connector);
    let report = collector.collect().await.unwrap();

    // The network failure is isolated, not a target failure.
    assert!(report.failures.is_empty());
    let state = sink.state();
    assert!(state.containers.contains_key("c1"));
    assert!(state.stats.contains_key("c1"));
    assert!(state.networks.is_empty());
    assert!(state.volumes.contains_key("data"));
}

#[tokio::test]
async fn test_network_upsert_failure_still_counts_other_records() {
    let sink = Arc::new(FakeSink::with_targets(vec![Target::new(
        "east",
        "east.internal",
        "1.43",
    )]));
    sink.state().fail_upsert_networks = true;

    let connector = FakeConnector::default().with_endpoint(
        "east.internal",
        Endpoint {
            containers: vec![container("c1")],
            networks: vec![network("n1", "bridge")],
            volumes: vec![volume("data")],
            ..Default::default()
        },
    );

    let collector = DockerCollector::new("dockwatch", sink.clone(), connector);
    let report = collector.collect().await.unwrap();

    // Container, stats and volume persisted; the failed network upsert
    // contributes nothing to the count.
    assert_eq!(report.records, 3);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_list_targets_failure_aborts_cycle() {
    let sink = Arc::new(FakeSink::default());
    sink.state().fail_list_targets = true;

    let collector = DockerCollector::new("dockwatch", sink.clone(), FakeConnector::default());
    let err = collector.collect().await.unwrap_err();

    assert!(matches!(err, CollectError::ListTargets(_)));
    // No summary is written for an aborted cycle.
    assert!(sink.state().summaries.is_empty());
}

#[tokio::test]
async fn test_identity_lookup_failure_is_fatal() {
    let sink = Arc::new(FakeSink::default());
    sink.state().fail_identity_lookup = true;

    let collector = DockerCollector::new("dockwatch", sink.clone(), FakeConnector::default());
    let err = collector.collect().await.unwrap_err();

    assert!(matches!(err, CollectError::Registration(_)));
    let state = sink.state();
    assert_eq!(state.identity_inserts, 0);
    assert!(state.summaries.is_empty());
}

#[tokio::test]
async fn test_identity_insert_failure_is_fatal() {
    let sink = Arc::new(FakeSink::default());
    sink.state().fail_identity_insert = true;

    let collector = DockerCollector::new("dockwatch", sink.clone(), FakeConnector::default());
    let err = collector.collect().await.unwrap_err();

    assert!(matches!(err, CollectError::Registration(_)));
    assert!(sink.state().identities.is_empty());
}

#[tokio::test]
async fn test_index_failure_does_not_block_registration() {
    let sink = Arc::new(FakeSink::default());
    sink.state().fail_indexes = true;

    let collector = DockerCollector::new("dockwatch", sink.clone(), FakeConnector::default());
    collector.collect().await.unwrap();

    let state = sink.state();
    // Registration completed and the cycle summarized despite the index
    // failure.
    assert_eq!(state.identity_inserts, 1);
    assert_eq!(state.summaries.len(), 1);
}

#[tokio::test]
async fn test_touch_failure_does_not_abort_cycle() {
    let sink = Arc::new(FakeSink::with_targets(vec![Target::new(
        "east",
        "east.internal",
        "1.43",
    )]));
    sink.state().fail_touch = true;

    let connector = FakeConnector::default().with_endpoint(
        "east.internal",
        Endpoint {
            containers: vec![container("c1")],
            ..Default::default()
        },
    );

    let collector = DockerCollector::new("dockwatch", sink.clone(), connector);
    let report = collector.collect().await.unwrap();

    // Stamping is best-effort bookkeeping: the target still collected and
    // the cycle still summarized.
    assert!(report.failures.is_empty());
    assert_eq!(report.records, 2);
    let state = sink.state();
    assert!(state.touched.is_empty());
    assert!(state.containers.contains_key("c1"));
    assert_eq!(state.summaries.len(), 1);
}

#[tokio::test]
async fn test_summary_write_failure_is_non_fatal() {
    let sink = Arc::new(FakeSink::with_targets(vec![Target::new(
        "east",
        "east.internal",
        "1.43",
    )]));
    sink.state().fail_summary = true;

    let connector = FakeConnector::default().with_endpoint(
        "east.internal",
        Endpoint {
            containers: vec![container("c1")],
            ..Default::default()
        },
    );

    let collector = DockerCollector::new("dockwatch", sink.clone(), connector);
    let report = collector.collect().await.unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.records, 2);
    assert!(sink.state().summaries.is_empty());
}

#[tokio::test]
async fn test_registration_is_idempotent_across_cycles() {
    let sink = Arc::new(FakeSink::default());
    let collector = DockerCollector::new("dockwatch", sink.clone(), FakeConnector::default());

    collector.collect().await.unwrap();
    collector.collect().await.unwrap();

    let state = sink.state();
    assert_eq!(state.identities.len(), 1);
    assert_eq!(state.identity_inserts, 1);
    // Indexes are ensured once, at registration.
    assert_eq!(state.index_calls, 1);
    // Both cycles summarized against the same identity.
    assert_eq!(state.summaries.len(), 2);
    assert_eq!(state.summaries[0].0, state.summaries[1].0);
}

#[tokio::test]
async fn test_restart_adopts_existing_identity() {
    let sink = Arc::new(FakeSink::default());

    let first = DockerCollector::new("dockwatch", sink.clone(), FakeConnector::default());
    first.collect().await.unwrap();

    // A new orchestrator over the same store must not register twice.
    let second = DockerCollector::new("dockwatch", sink.clone(), FakeConnector::default());
    second.collect().await.unwrap();

    let state = sink.state();
    assert_eq!(state.identity_inserts, 1);
    assert_eq!(state.summaries[0].0, state.summaries[1].0);
}

#[tokio::test]
async fn test_concurrent_first_collect_registers_once() {
    let sink = Arc::new(FakeSink {
        lookup_delay: Some(Duration::from_millis(20)),
        ..Default::default()
    });
    let collector = Arc::new(DockerCollector::new(
        "dockwatch",
        sink.clone(),
        FakeConnector::default(),
    ));

    let a = tokio::spawn({
        let collector = Arc::clone(&collector);
        async move { collector.collect().await }
    });
    let b = tokio::spawn({
        let collector = Arc::clone(&collector);
        async move { collector.collect().await }
    });

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let state = sink.state();
    assert_eq!(state.identity_inserts, 1);
    assert_eq!(state.identities.len(), 1);
    // Both cycles attributed their summary to the single adopted id.
    assert_eq!(state.summaries.len(), 2);
    assert_eq!(state.summaries[0].0, state.summaries[1].0);
}

#[tokio::test]
async fn test_second_cycle_overwrites_inventory() {
    let sink = Arc::new(FakeSink::with_targets(vec![Target::new(
        "east",
        "east.internal",
        "1.43",
    )]));
    let connector = FakeConnector::default().with_endpoint(
        "east.internal",
        Endpoint {
            containers: vec![container("c1")],
            ..Default::default()
        },
    );

    let collector = DockerCollector::new("dockwatch", sink.clone(), connector);
    collector.collect().await.unwrap();
    collector.collect().await.unwrap();

    let state = sink.state();
    // Same natural key twice lands on one record.
    assert_eq!(state.containers.len(), 1);
    // Cumulative bookkeeping still sees both cycles.
    assert_eq!(state.summaries.len(), 2);
}
