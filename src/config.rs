//! Configuration types for rebalance planning and propagation.

use crate::error::{Error, Result};
use std::time::Duration;

/// Main configuration for the metadata resolver and propagation coordinator.
#[derive(Debug, Clone)]
pub struct RebalanceConfig {
    /// Maximum number of per-node calls in flight at once.
    /// Size this to the expected cluster width.
    pub max_parallelism: usize,

    /// How long to wait for in-flight calls before abandoning them.
    /// Abandoned calls keep running; they are never cancelled mid-write.
    pub shutdown_timeout: Duration,

    /// Settings for the admin client used to reach remote nodes.
    pub admin: AdminClientConfig,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            max_parallelism: 8,
            shutdown_timeout: Duration::from_secs(30),
            admin: AdminClientConfig::default(),
        }
    }
}

impl RebalanceConfig {
    /// Create a configuration sized for a cluster of `cluster_width` nodes.
    pub fn for_cluster_width(cluster_width: usize) -> Self {
        Self {
            max_parallelism: cluster_width.max(1),
            ..Default::default()
        }
    }

    /// Set the worker pool size.
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism;
        self
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set admin client configuration.
    pub fn with_admin_config(mut self, admin: AdminClientConfig) -> Self {
        self.admin = admin;
        self
    }

    /// Reject configurations that can never complete a call.
    pub fn validate(&self) -> Result<()> {
        if self.max_parallelism == 0 {
            return Err(Error::Config("max_parallelism must be at least 1".to_string()));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(Error::Config("shutdown_timeout must be non-zero".to_string()));
        }
        self.admin.validate()
    }
}

/// Connection settings for an admin client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminClientConfig {
    /// Maximum pooled connections per remote node.
    pub max_connections_per_node: usize,

    /// Threads the client may use for blocking socket work.
    pub max_threads: usize,

    /// Timeout for establishing a connection.
    pub connection_timeout: Duration,

    /// Timeout for a socket read or write.
    pub socket_timeout: Duration,

    /// Socket buffer size in bytes.
    pub socket_buffer_size: usize,
}

impl Default for AdminClientConfig {
    fn default() -> Self {
        Self {
            max_connections_per_node: 1,
            max_threads: 1,
            connection_timeout: Duration::from_secs(60),
            socket_timeout: Duration::from_secs(24 * 60 * 60),
            socket_buffer_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

impl AdminClientConfig {
    /// Temporary client settings used while a rebalance runs.
    pub fn for_rebalance(num_threads: usize, connections_per_node: usize) -> Self {
        Self {
            max_connections_per_node: connections_per_node,
            max_threads: num_threads,
            ..Default::default()
        }
    }

    /// Set connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set socket timeout.
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    /// Set socket buffer size.
    pub fn with_socket_buffer_size(mut self, size: usize) -> Self {
        self.socket_buffer_size = size;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_connections_per_node == 0 || self.max_threads == 0 {
            return Err(Error::Config(
                "admin client needs at least one thread and one connection per node".to_string(),
            ));
        }
        Ok(())
    }
}
