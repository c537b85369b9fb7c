//! Bounded concurrent calls to a set of nodes.
//!
//! Each node gets its own task; a semaphore caps how many run at once.
//! Results land in a map keyed by node id, so callers see them in id order
//! whatever order the calls finished in.
//!
//! Waiting is bounded by the shutdown timeout. Tasks still running when it
//! expires are left to finish on their own: they are never aborted, so a
//! remote write is not cut off halfway. Their nodes are reported as
//! abandoned.

use crate::admin::AdminResult;
use crate::config::RebalanceConfig;
use crate::error::AdminError;
use crate::types::NodeId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

/// What came back from one round of calls.
#[derive(Debug)]
pub(crate) struct FanOutOutcome<T> {
    /// Per-node results of the calls that finished in time.
    pub completed: BTreeMap<NodeId, AdminResult<T>>,
    /// Nodes whose call was still running at the shutdown timeout.
    pub abandoned: BTreeSet<NodeId>,
}

impl<T> FanOutOutcome<T> {
    /// The node's result, with an abandoned call reported as a timeout.
    pub fn take(&mut self, node_id: NodeId) -> AdminResult<T> {
        if self.abandoned.contains(&node_id) {
            return Err(AdminError::Timeout(node_id));
        }
        self.completed
            .remove(&node_id)
            .unwrap_or(Err(AdminError::Unreachable(node_id)))
    }
}

/// Worker pool settings for one round of per-node calls.
#[derive(Debug, Clone)]
pub(crate) struct FanOut {
    max_parallelism: usize,
    shutdown_timeout: Duration,
}

impl FanOut {
    pub fn new(config: &RebalanceConfig) -> Self {
        Self {
            max_parallelism: config.max_parallelism.max(1),
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// Run `call` once for every distinct id in `node_ids`.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        node_ids: &[NodeId],
        call: F,
    ) -> FanOutOutcome<T>
    where
        T: Send + 'static,
        F: Fn(NodeId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AdminResult<T>> + Send + 'static,
    {
        let targets: BTreeSet<NodeId> = node_ids.iter().copied().collect();
        let semaphore = Arc::new(Semaphore::new(self.max_parallelism));
        let results: Arc<Mutex<BTreeMap<NodeId, AdminResult<T>>>> =
            Arc::new(Mutex::new(BTreeMap::new()));
        let call = Arc::new(call);

        let mut handles = Vec::with_capacity(targets.len());
        for &node_id in &targets {
            let semaphore = semaphore.clone();
            let results = results.clone();
            let call = call.clone();
            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let result = call(node_id).await;
                results.lock().insert(node_id, result);
            });
            handles.push((node_id, handle));
        }

        let deadline = Instant::now() + self.shutdown_timeout;
        for (node_id, handle) in handles {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(node_id, operation, error = %e, "Call task failed");
                    results
                        .lock()
                        .insert(node_id, Err(AdminError::Remote(format!("task failed: {}", e))));
                }
                // Past the deadline: the remaining handles are dropped, which
                // detaches their tasks without stopping them.
                Err(_) => break,
            }
        }

        let completed = std::mem::take(&mut *results.lock());
        let abandoned: BTreeSet<NodeId> = targets
            .into_iter()
            .filter(|id| !completed.contains_key(id))
            .collect();

        if abandoned.is_empty() {
            debug!(operation, nodes = completed.len(), "All calls finished");
        } else {
            warn!(
                operation,
                ?abandoned,
                timeout = ?self.shutdown_timeout,
                "Abandoning calls still in flight at shutdown timeout"
            );
        }

        FanOutOutcome {
            completed,
            abandoned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fanout(parallelism: usize, timeout: Duration) -> FanOut {
        FanOut::new(
            &RebalanceConfig::default()
                .with_max_parallelism(parallelism)
                .with_shutdown_timeout(timeout),
        )
    }

    #[tokio::test]
    async fn test_results_keyed_by_node() {
        let pool = fanout(4, Duration::from_secs(5));
        let mut outcome = pool
            .run("echo", &[3, 1, 2, 1], |node_id| async move {
                if node_id == 2 {
                    Err(AdminError::Unreachable(node_id))
                } else {
                    Ok(node_id * 10)
                }
            })
            .await;

        assert!(outcome.abandoned.is_empty());
        assert_eq!(outcome.completed.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(outcome.take(3), Ok(30));
        assert_eq!(outcome.take(2), Err(AdminError::Unreachable(2)));
    }

    #[tokio::test]
    async fn test_parallelism_is_bounded() {
        let pool = fanout(2, Duration::from_secs(5));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (running.clone(), peak.clone());
        let outcome = pool
            .run("count", &[0, 1, 2, 3, 4, 5], move |_| {
                let (running, peak) = (r.clone(), p.clone());
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert_eq!(outcome.completed.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_slow_calls_abandoned_not_cancelled() {
        let pool = fanout(4, Duration::from_millis(50));
        let finished = Arc::new(AtomicUsize::new(0));

        let f = finished.clone();
        let mut outcome = pool
            .run("slow", &[0, 1], move |node_id| {
                let finished = f.clone();
                async move {
                    if node_id == 1 {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert_eq!(outcome.abandoned, BTreeSet::from([1]));
        assert_eq!(outcome.take(1), Err(AdminError::Timeout(1)));
        assert_eq!(outcome.take(0), Ok(()));

        // The abandoned call still runs to completion.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }
}
