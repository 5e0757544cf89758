//! Shared fixtures for scheduler integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use distbuild_core::{NodeId, NodeType, PackageGraph, PackageNode, PackageVer, SharedGraph};
use distbuild_scheduler::{AgentError, AgentOutput, BuildAgent};
use tempfile::TempDir;

/// Agent that records calls and fails packages whose archive name contains
/// `fail_on`
pub struct MockAgent {
    pub log_dir: TempDir,
    pub calls: AtomicUsize,
    pub fail_on: Option<String>,
    pub panic_on: Option<String>,
}

impl MockAgent {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log_dir: TempDir::new().unwrap(),
            calls: AtomicUsize::new(0),
            fail_on: None,
            panic_on: None,
        })
    }

    pub fn failing_on(pattern: &str) -> Arc<Self> {
        Arc::new(Self {
            log_dir: TempDir::new().unwrap(),
            calls: AtomicUsize::new(0),
            fail_on: Some(pattern.to_string()),
            panic_on: None,
        })
    }

    pub fn panicking_on(pattern: &str) -> Arc<Self> {
        Arc::new(Self {
            log_dir: TempDir::new().unwrap(),
            calls: AtomicUsize::new(0),
            fail_on: None,
            panic_on: Some(pattern.to_string()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildAgent for MockAgent {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn build_package(
        &self,
        archive: &Path,
        log_base_name: &str,
        _target_arch: &str,
        run_check: bool,
        _dependencies: &[PathBuf],
    ) -> Result<AgentOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = archive.to_string_lossy();
        if matches!(&self.panic_on, Some(pattern) if name.contains(pattern.as_str())) {
            panic!("agent crashed on {name}");
        }

        let log_file = self.log_dir.path().join(log_base_name);
        let contents = if run_check {
            "running tests\nCHECK DONE EXIT STATUS 0\n"
        } else {
            "build complete\n"
        };
        tokio::fs::write(&log_file, contents).await.unwrap();

        if matches!(&self.fail_on, Some(pattern) if name.contains(pattern.as_str())) {
            return Err(AgentError::new("rpmbuild failed").with_log(log_file));
        }

        Ok(AgentOutput {
            built_files: vec![archive.to_path_buf()],
            log_file,
        })
    }
}

/// Node ids for one package: its build node, run node and test node
pub struct Package {
    pub build: NodeId,
    pub run: NodeId,
    pub test: NodeId,
    pub artifact: PathBuf,
}

/// Add build, run and test nodes for `name` under `root`
pub fn add_package(graph: &mut PackageGraph, root: &Path, name: &str) -> Package {
    let archive = root.join("SRPMS").join(format!("{name}-1.0.src.rpm"));
    let artifact = root.join("RPMS").join(format!("{name}-1.0.rpm"));
    let node = |node_type| {
        PackageNode::new(PackageVer::new(name, "1.0"), node_type)
            .with_architecture("x86_64")
            .with_archive(archive.clone())
    };

    let build = graph.add_node(node(NodeType::LocalBuild).with_artifact(artifact.clone()));
    let run = graph.add_node(node(NodeType::LocalRun).with_artifact(artifact.clone()));
    let test = graph.add_node(node(NodeType::Test));
    graph.add_edge(run, build).unwrap();
    graph.add_edge(test, run).unwrap();

    Package {
        build,
        run,
        test,
        artifact,
    }
}

/// Graph holding one package per name
pub fn package_graph(root: &Path, names: &[&str]) -> (SharedGraph, Vec<Package>) {
    let mut graph = PackageGraph::new();
    let packages = names
        .iter()
        .map(|name| add_package(&mut graph, root, name))
        .collect();
    (SharedGraph::new(graph), packages)
}
