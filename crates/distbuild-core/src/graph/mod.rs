//! Package dependency graph
//!
//! The graph is built ahead of scheduling by an external graph builder. Edges
//! point from a node to the nodes it depends on. Workers only read the graph
//! structure; the one thing that changes during a build is node state, which
//! goes through [`SharedGraph`].

mod node;
mod prebuilt;
mod shared;

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GraphError;

pub use node::{has_artifact, NodeId, NodeState, NodeType, PackageNode, NO_ARTIFACT_PATH};
pub use prebuilt::PrebuiltStatus;
pub use shared::SharedGraph;

/// Directed package graph (node -> dependencies)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageGraph {
    nodes: Vec<PackageNode>,
    /// Outgoing edges per node, in insertion order
    edges: Vec<Vec<NodeId>>,
}

impl PackageGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node and return its id
    pub fn add_node(&mut self, mut node: PackageNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.nodes.push(node);
        self.edges.push(Vec::new());
        id
    }

    /// Record that `from` depends on `to`
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        if from.0 >= self.nodes.len() || to.0 >= self.nodes.len() {
            return Err(GraphError::EdgeOutOfRange { from, to });
        }
        let out = &mut self.edges[from.0];
        if !out.contains(&to) {
            out.push(to);
        }
        Ok(())
    }

    /// Get a node by id
    pub fn get(&self, id: NodeId) -> Option<&PackageNode> {
        self.nodes.get(id.0)
    }

    /// Get a node by id for modification
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut PackageNode> {
        self.nodes.get_mut(id.0)
    }

    /// Direct dependencies of a node
    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        self.edges.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[PackageNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Breadth-first walk starting at `start`.
    ///
    /// `traverse` decides whether an edge into a node may be followed; nodes
    /// reached only through rejected edges are never visited. `visit` is called
    /// once per visited node with its depth (the start node has depth 0) and
    /// returns `true` to stop the walk early. Returns the node the walk stopped
    /// at, if any.
    pub fn walk_breadth_first<T, V>(
        &self,
        start: NodeId,
        mut traverse: T,
        mut visit: V,
    ) -> Result<Option<NodeId>, GraphError>
    where
        T: FnMut(&PackageNode) -> bool,
        V: FnMut(&PackageNode, usize) -> bool,
    {
        let root = self.get(start).ok_or(GraphError::NodeNotFound(start))?;

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();

        visited.insert(start);
        if visit(root, 0) {
            return Ok(Some(start));
        }
        queue.push_back((start, 0));

        while let Some((current, depth)) = queue.pop_front() {
            for &next in self.dependencies(current) {
                if visited.contains(&next) {
                    continue;
                }
                let Some(node) = self.get(next) else {
                    continue;
                };
                if !traverse(node) {
                    continue;
                }
                visited.insert(next);
                if visit(node, depth + 1) {
                    return Ok(Some(next));
                }
                queue.push_back((next, depth + 1));
            }
        }

        Ok(None)
    }

    /// Artifacts a source archive is expected to produce.
    ///
    /// These are the artifact paths of every `LocalRun` node built from the
    /// archive.
    pub fn expected_artifacts(&self, archive: &Path) -> Vec<PathBuf> {
        let mut expected = Vec::new();
        for node in &self.nodes {
            if node.node_type == NodeType::LocalRun
                && node.archive_path == archive
                && node.has_artifact()
                && !expected.contains(&node.artifact_path)
            {
                expected.push(node.artifact_path.clone());
            }
        }
        debug!(
            archive = %archive.display(),
            count = expected.len(),
            "collected expected artifacts"
        );
        expected
    }
}
