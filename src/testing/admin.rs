//! In-memory admin client with failure injection.

use crate::admin::{AdminClient, AdminResult};
use crate::cluster::Cluster;
use crate::config::AdminClientConfig;
use crate::error::AdminError;
use crate::store::StoreDefinition;
use crate::types::{NodeId, ServerState};
use crate::versioning::{VectorClock, Versioned};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Which admin operation a recorded call was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOperation {
    GetCluster,
    UpdateCluster,
    GetStoreDefinitions,
    GetServerState,
    GetReadOnlyFormat,
}

/// One call received by [`InMemoryAdminClient`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCall {
    pub node_id: NodeId,
    pub operation: AdminOperation,
}

/// State held for one simulated node.
#[derive(Debug, Clone)]
struct RemoteNode {
    cluster: Option<Versioned<Cluster>>,
    state: ServerState,
    store_defs: Vec<StoreDefinition>,
    read_only_formats: BTreeMap<String, String>,
    unreachable: bool,
    reject_updates: bool,
    delay: Option<Duration>,
}

impl Default for RemoteNode {
    fn default() -> Self {
        Self {
            cluster: None,
            state: ServerState::Normal,
            store_defs: Vec::new(),
            read_only_formats: BTreeMap::new(),
            unreachable: false,
            reject_updates: false,
            delay: None,
        }
    }
}

/// An [`AdminClient`] whose nodes live in memory.
///
/// Nodes that were never configured are unreachable. Any setter registers
/// the node it names.
///
/// Calls are unbounded unless an [`AdminClientConfig`] is attached with
/// [`with_admin_config`](Self::with_admin_config).
#[derive(Debug, Default)]
pub struct InMemoryAdminClient {
    nodes: RwLock<BTreeMap<NodeId, RemoteNode>>,
    calls: Mutex<Vec<AdminCall>>,
    limits: Option<ConnectionLimits>,
}

/// Connection caps derived from an [`AdminClientConfig`].
#[derive(Debug)]
struct ConnectionLimits {
    config: AdminClientConfig,
    threads: Arc<Semaphore>,
    per_node: Mutex<BTreeMap<NodeId, Arc<Semaphore>>>,
}

/// Held for the duration of one bounded call.
#[derive(Debug)]
struct CallPermit {
    _thread: OwnedSemaphorePermit,
    _connection: OwnedSemaphorePermit,
}

impl ConnectionLimits {
    fn new(config: AdminClientConfig) -> Self {
        Self {
            threads: Arc::new(Semaphore::new(config.max_threads.max(1))),
            per_node: Mutex::new(BTreeMap::new()),
            config,
        }
    }

    /// Wait for a thread and a connection to the node, at most the
    /// connection timeout.
    async fn acquire(&self, node_id: NodeId) -> AdminResult<CallPermit> {
        let connections = self
            .per_node
            .lock()
            .entry(node_id)
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_connections_per_node.max(1))))
            .clone();
        let threads = self.threads.clone();

        let acquire = async move {
            let connection = connections.acquire_owned().await;
            let thread = threads.acquire_owned().await;
            (thread, connection)
        };
        match tokio::time::timeout(self.config.connection_timeout, acquire).await {
            Ok((Ok(thread), Ok(connection))) => Ok(CallPermit {
                _thread: thread,
                _connection: connection,
            }),
            Ok(_) => Err(AdminError::Unreachable(node_id)),
            Err(_) => Err(AdminError::Timeout(node_id)),
        }
    }
}

impl InMemoryAdminClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node of `cluster` holding `cluster` at the empty version.
    pub fn with_cluster(cluster: &Cluster) -> Self {
        let client = Self::new();
        for node_id in cluster.node_ids() {
            client.set_cluster(node_id, Versioned::new(cluster.clone()));
        }
        client
    }

    /// Bound concurrent calls by the thread and per-node connection limits
    /// of `config`.
    pub fn with_admin_config(mut self, config: AdminClientConfig) -> Self {
        self.limits = Some(ConnectionLimits::new(config));
        self
    }

    fn update_node(&self, node_id: NodeId, f: impl FnOnce(&mut RemoteNode)) {
        f(self.nodes.write().entry(node_id).or_default());
    }

    pub fn set_cluster(&self, node_id: NodeId, cluster: Versioned<Cluster>) {
        self.update_node(node_id, |n| n.cluster = Some(cluster));
    }

    pub fn set_server_state(&self, node_id: NodeId, state: ServerState) {
        self.update_node(node_id, |n| n.state = state);
    }

    pub fn set_store_definitions(&self, node_id: NodeId, defs: Vec<StoreDefinition>) {
        self.update_node(node_id, |n| n.store_defs = defs);
    }

    pub fn set_read_only_format(&self, node_id: NodeId, store: &str, format: &str) {
        self.update_node(node_id, |n| {
            n.read_only_formats.insert(store.to_string(), format.to_string());
        });
    }

    /// Make every call to the node fail as unreachable.
    pub fn fail_node(&self, node_id: NodeId) {
        self.update_node(node_id, |n| n.unreachable = true);
    }

    pub fn recover_node(&self, node_id: NodeId) {
        self.update_node(node_id, |n| n.unreachable = false);
    }

    /// Make the node refuse cluster updates while still answering reads.
    pub fn reject_updates(&self, node_id: NodeId) {
        self.update_node(node_id, |n| n.reject_updates = true);
    }

    /// Delay every call to the node before it is answered.
    pub fn set_delay(&self, node_id: NodeId, delay: Duration) {
        self.update_node(node_id, |n| n.delay = Some(delay));
    }

    /// The versioned cluster currently stored on the node.
    pub fn stored_cluster(&self, node_id: NodeId) -> Option<Versioned<Cluster>> {
        self.nodes.read().get(&node_id).and_then(|n| n.cluster.clone())
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<AdminCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Record the call, take a connection, wait out any delay, then check
    /// reachability. The returned permit must live until the call is done.
    async fn enter(&self, node_id: NodeId, operation: AdminOperation) -> AdminResult<Option<CallPermit>> {
        self.calls.lock().push(AdminCall { node_id, operation });

        let permit = match &self.limits {
            Some(limits) => Some(limits.acquire(node_id).await?),
            None => None,
        };

        let delay = self.nodes.read().get(&node_id).and_then(|n| n.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reachable = self
            .nodes
            .read()
            .get(&node_id)
            .is_some_and(|n| !n.unreachable);
        if reachable {
            Ok(permit)
        } else {
            Err(AdminError::Unreachable(node_id))
        }
    }

    fn read_node<T>(&self, node_id: NodeId, f: impl FnOnce(&RemoteNode) -> AdminResult<T>) -> AdminResult<T> {
        match self.nodes.read().get(&node_id) {
            Some(node) => f(node),
            None => Err(AdminError::Unreachable(node_id)),
        }
    }
}

#[async_trait::async_trait]
impl AdminClient for InMemoryAdminClient {
    async fn remote_cluster(&self, node_id: NodeId) -> AdminResult<Versioned<Cluster>> {
        let _permit = self.enter(node_id, AdminOperation::GetCluster).await?;
        self.read_node(node_id, |n| {
            n.cluster
                .clone()
                .ok_or_else(|| AdminError::Remote(format!("no cluster metadata on node {}", node_id)))
        })
    }

    async fn update_remote_cluster(
        &self,
        node_id: NodeId,
        cluster: &Cluster,
        version: &VectorClock,
    ) -> AdminResult<()> {
        let _permit = self.enter(node_id, AdminOperation::UpdateCluster).await?;
        let mut nodes = self.nodes.write();
        let node = nodes.get_mut(&node_id).ok_or(AdminError::Unreachable(node_id))?;
        if node.reject_updates {
            return Err(AdminError::Rejected(format!(
                "node {} refuses cluster updates",
                node_id
            )));
        }
        node.cluster = Some(Versioned::with_version(cluster.clone(), version.clone()));
        Ok(())
    }

    async fn remote_store_definitions(&self, node_id: NodeId) -> AdminResult<Vec<StoreDefinition>> {
        let _permit = self.enter(node_id, AdminOperation::GetStoreDefinitions).await?;
        self.read_node(node_id, |n| Ok(n.store_defs.clone()))
    }

    async fn remote_server_state(&self, node_id: NodeId) -> AdminResult<ServerState> {
        let _permit = self.enter(node_id, AdminOperation::GetServerState).await?;
        self.read_node(node_id, |n| Ok(n.state))
    }

    async fn read_only_storage_format(
        &self,
        node_id: NodeId,
        store_names: &[String],
    ) -> AdminResult<BTreeMap<String, String>> {
        let _permit = self.enter(node_id, AdminOperation::GetReadOnlyFormat).await?;
        self.read_node(node_id, |n| {
            store_names
                .iter()
                .map(|name| {
                    n.read_only_formats
                        .get(name)
                        .map(|format| (name.clone(), format.clone()))
                        .ok_or_else(|| AdminError::Remote(format!("store {} not found", name)))
                })
                .collect()
        })
    }
}
