//! Concurrency-safe handle to the package graph

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, trace};

use super::{NodeId, NodeState, NodeType, PackageGraph, PackageNode, PrebuiltStatus};

/// Shared package graph guarded by a single read/write lock.
///
/// Readers hold the lock only for one traversal or query. All state writes
/// go through the methods on this type so they are serialized against
/// readers.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<PackageGraph>>,
}

impl SharedGraph {
    /// Wrap a fully built graph
    pub fn new(graph: PackageGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Acquire the read lock. Do not hold the guard across a build.
    pub async fn read(&self) -> RwLockReadGuard<'_, PackageGraph> {
        self.inner.read().await
    }

    /// Copy of a single node
    pub async fn node(&self, id: NodeId) -> Option<PackageNode> {
        self.inner.read().await.get(id).cloned()
    }

    /// Current state of a node
    pub async fn state(&self, id: NodeId) -> Option<NodeState> {
        self.inner.read().await.get(id).map(|n| n.state)
    }

    /// Check whether a source archive's artifacts are already built.
    ///
    /// The expected set is read under the read lock; file checks happen after
    /// the lock is released.
    pub async fn is_prebuilt(&self, archive: &Path) -> PrebuiltStatus {
        let expected = self.inner.read().await.expected_artifacts(archive);
        PrebuiltStatus::check(expected).await
    }

    /// Set the state of every `LocalBuild` node in `ids`.
    ///
    /// Other node types are skipped. Returns the number of nodes updated.
    pub async fn set_build_states(&self, ids: &[NodeId], state: NodeState) -> usize {
        let mut graph = self.inner.write().await;
        let mut updated = 0;
        for &id in ids {
            match graph.get_mut(id) {
                Some(node) if node.node_type == NodeType::LocalBuild => {
                    trace!(node = %node.versioned_pkg, %state, "updating node state");
                    node.state = state;
                    updated += 1;
                }
                Some(_) => {}
                None => debug!(node = %id, "skipping state update for unknown node"),
            }
        }
        updated
    }
}

impl From<PackageGraph> for SharedGraph {
    fn from(graph: PackageGraph) -> Self {
        Self::new(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackageVer;

    fn sample() -> (SharedGraph, NodeId, NodeId, NodeId) {
        let mut graph = PackageGraph::new();
        let build = graph.add_node(PackageNode::new(
            PackageVer::new("a", "1"),
            NodeType::LocalBuild,
        ));
        let test = graph.add_node(PackageNode::new(PackageVer::new("a", "1"), NodeType::Test));
        let run = graph.add_node(PackageNode::new(
            PackageVer::new("a", "1"),
            NodeType::LocalRun,
        ));
        (SharedGraph::new(graph), build, test, run)
    }

    #[tokio::test]
    async fn test_set_build_states_only_touches_build_nodes() {
        let (graph, build, test, run) = sample();

        let updated = graph
            .set_build_states(&[build, test, run, NodeId(99)], NodeState::UpToDate)
            .await;

        assert_eq!(updated, 1);
        assert_eq!(graph.state(build).await, Some(NodeState::UpToDate));
        assert_eq!(graph.state(test).await, Some(NodeState::Unknown));
        assert_eq!(graph.state(run).await, Some(NodeState::Unknown));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (graph, build, _, _) = sample();
        let other = graph.clone();

        other.set_build_states(&[build], NodeState::BuildError).await;
        assert_eq!(graph.state(build).await, Some(NodeState::BuildError));
    }
}
