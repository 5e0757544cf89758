//! Build dependency resolution over the package graph

use std::collections::HashSet;
use std::path::PathBuf;

use distbuild_core::graph::has_artifact;
use distbuild_core::{GraphError, NodeId, NodeType, PackageGraph, SharedGraph};
use tracing::{debug, instrument};

/// Artifacts that must be installed before `node` can be built or tested.
///
/// Holds the graph read lock for the whole traversal and releases it before
/// returning.
pub async fn resolve_dependencies(
    graph: &SharedGraph,
    node: NodeId,
) -> Result<Vec<PathBuf>, GraphError> {
    let graph = graph.read().await;
    collect_dependencies(&graph, node)
}

/// Breadth-first walk from `node` collecting artifact paths.
///
/// Edges into `LocalBuild` nodes are never followed, so another package's
/// build requirements do not leak into this node's list. Empty paths, the
/// "no artifact" sentinel and the node's own artifact are skipped. The result
/// has no duplicates and keeps first-visit order.
#[instrument(skip_all, fields(node = %node))]
pub fn collect_dependencies(graph: &PackageGraph, node: NodeId) -> Result<Vec<PathBuf>, GraphError> {
    let own_artifact = graph
        .get(node)
        .ok_or(GraphError::NodeNotFound(node))?
        .artifact_path
        .clone();

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut dependencies = Vec::new();

    graph.walk_breadth_first(
        node,
        |next| next.node_type != NodeType::LocalBuild,
        |visited, _depth| {
            let path = &visited.artifact_path;
            if has_artifact(path) && *path != own_artifact && seen.insert(path.clone()) {
                dependencies.push(path.clone());
            }
            false
        },
    )?;

    debug!(count = dependencies.len(), "resolved build dependencies");
    Ok(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use distbuild_core::{PackageNode, PackageVer};

    fn add(graph: &mut PackageGraph, name: &str, node_type: NodeType, artifact: &str) -> NodeId {
        graph.add_node(
            PackageNode::new(PackageVer::new(name, "1.0"), node_type).with_artifact(artifact),
        )
    }

    /// app (build) -> libfoo (run) -> libfoo (build) -> gcc (run)
    ///                libfoo (run) -> libc (run)
    ///             -> libbar (run) -> libc (run)
    ///             -> app (run, own artifact)
    fn sample() -> (PackageGraph, NodeId) {
        let mut graph = PackageGraph::new();
        let app = add(&mut graph, "app", NodeType::LocalBuild, "/out/app.rpm");
        let app_run = add(&mut graph, "app", NodeType::LocalRun, "/out/app.rpm");
        let foo_run = add(&mut graph, "libfoo", NodeType::LocalRun, "/out/libfoo.rpm");
        let foo_build = add(&mut graph, "libfoo", NodeType::LocalBuild, "/out/libfoo.rpm");
        let gcc_run = add(&mut graph, "gcc", NodeType::RemoteRun, "/cache/gcc.rpm");
        let bar_run = add(&mut graph, "libbar", NodeType::PreBuilt, "/cache/libbar.rpm");
        let libc_run = add(&mut graph, "libc", NodeType::RemoteRun, "/cache/libc.rpm");

        graph.add_edge(app, foo_run).unwrap();
        graph.add_edge(app, bar_run).unwrap();
        graph.add_edge(app, app_run).unwrap();
        graph.add_edge(foo_run, foo_build).unwrap();
        graph.add_edge(foo_build, gcc_run).unwrap();
        graph.add_edge(foo_run, libc_run).unwrap();
        graph.add_edge(bar_run, libc_run).unwrap();

        (graph, app)
    }

    #[test]
    fn test_collects_runtime_closure() {
        let (graph, app) = sample();
        let deps = collect_dependencies(&graph, app).unwrap();

        assert_eq!(
            deps,
            vec![
                PathBuf::from("/out/libfoo.rpm"),
                PathBuf::from("/cache/libbar.rpm"),
                PathBuf::from("/cache/libc.rpm"),
            ]
        );
    }

    #[test]
    fn test_does_not_cross_build_nodes() {
        let (graph, app) = sample();
        let deps = collect_dependencies(&graph, app).unwrap();
        assert!(!deps.contains(&PathBuf::from("/cache/gcc.rpm")));
    }

    #[test]
    fn test_excludes_own_artifact_and_sentinel() {
        let mut graph = PackageGraph::new();
        let test = add(&mut graph, "app", NodeType::Test, "/out/app.rpm");
        let own = add(&mut graph, "app", NodeType::LocalRun, "/out/app.rpm");
        let meta = add(&mut graph, "meta", NodeType::PureMeta, distbuild_core::NO_ARTIFACT_PATH);
        let empty = add(&mut graph, "empty", NodeType::Goal, "");
        let dep = add(&mut graph, "dep", NodeType::LocalRun, "/out/dep.rpm");
        graph.add_edge(test, own).unwrap();
        graph.add_edge(test, meta).unwrap();
        graph.add_edge(test, empty).unwrap();
        graph.add_edge(meta, dep).unwrap();

        let deps = collect_dependencies(&graph, test).unwrap();
        assert_eq!(deps, vec![PathBuf::from("/out/dep.rpm")]);
    }

    #[test]
    fn test_duplicate_paths_collapse() {
        let mut graph = PackageGraph::new();
        let root = add(&mut graph, "root", NodeType::LocalBuild, "/out/root.rpm");
        let a = add(&mut graph, "a", NodeType::LocalRun, "/out/shared.rpm");
        let b = add(&mut graph, "b", NodeType::LocalRun, "/out/shared.rpm");
        graph.add_edge(root, a).unwrap();
        graph.add_edge(root, b).unwrap();

        let deps = collect_dependencies(&graph, root).unwrap();
        assert_eq!(deps, vec![PathBuf::from("/out/shared.rpm")]);
    }

    #[test]
    fn test_unknown_node() {
        let graph = PackageGraph::new();
        let err = collect_dependencies(&graph, NodeId(3)).unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound(NodeId(3))));
    }

    #[tokio::test]
    async fn test_resolve_through_shared_graph() {
        let (graph, app) = sample();
        let shared = SharedGraph::new(graph);

        let deps = resolve_dependencies(&shared, app).await.unwrap();
        assert_eq!(deps.len(), 3);
    }
}
