//! Test doubles shared by the unit tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use distbuild_core::{NodeId, NodeType, PackageGraph, PackageNode, PackageVer, SharedGraph};
use tempfile::TempDir;

use crate::agent::{AgentError, AgentOutput, BuildAgent};

/// Agent that writes a log into a temp dir and fails on demand
pub struct RecordingAgent {
    log_dir: TempDir,
    calls: AtomicUsize,
    failures: usize,
    message: String,
    check_log: String,
    write_log: bool,
    panics: bool,
    dependencies: Mutex<Vec<Vec<PathBuf>>>,
}

impl RecordingAgent {
    pub fn succeeding() -> Self {
        Self::flaky(0)
    }

    pub fn failing(message: &str) -> Self {
        let mut agent = Self::flaky(usize::MAX);
        agent.message = message.to_string();
        agent
    }

    /// Fail the first `failures` calls, then succeed
    pub fn flaky(failures: usize) -> Self {
        Self {
            log_dir: TempDir::new().unwrap(),
            calls: AtomicUsize::new(0),
            failures,
            message: "agent failure".to_string(),
            check_log: "CHECK DONE EXIT STATUS 0\n".to_string(),
            write_log: true,
            panics: false,
            dependencies: Mutex::new(Vec::new()),
        }
    }

    /// Contents written to test logs
    pub fn with_check_log(mut self, contents: &str) -> Self {
        self.check_log = contents.to_string();
        self
    }

    /// Panic on every call
    pub fn panicking() -> Self {
        let mut agent = Self::succeeding();
        agent.panics = true;
        agent
    }

    /// Report a log path without writing it
    pub fn without_log(mut self) -> Self {
        self.write_log = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn log_dir(&self) -> &Path {
        self.log_dir.path()
    }

    pub fn dependencies(&self) -> Vec<Vec<PathBuf>> {
        self.dependencies.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildAgent for RecordingAgent {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn build_package(
        &self,
        archive: &Path,
        log_base_name: &str,
        _target_arch: &str,
        run_check: bool,
        dependencies: &[PathBuf],
    ) -> Result<AgentOutput, AgentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("agent crashed building {}", archive.display());
        }
        self.dependencies.lock().unwrap().push(dependencies.to_vec());

        let log_file = self.log_dir.path().join(log_base_name);
        let contents = if run_check {
            self.check_log.clone()
        } else {
            format!("building {}\n", archive.display())
        };
        if self.write_log {
            tokio::fs::write(&log_file, contents).await.unwrap();
        }

        if call < self.failures {
            return Err(AgentError::new(self.message.clone()).with_log(log_file));
        }

        let built_files = if run_check {
            Vec::new()
        } else {
            vec![archive.with_extension("rpm")]
        };
        Ok(AgentOutput {
            built_files,
            log_file,
        })
    }
}

/// Node ids of [`archive_graph`]
pub struct ArchiveGraph {
    /// `LocalBuild` for foo
    pub build: NodeId,
    /// `LocalBuild` for foo-devel, same archive
    pub sibling_build: NodeId,
    /// `LocalRun` for foo
    pub run: NodeId,
    /// `LocalRun` for foo-devel
    pub sibling_run: NodeId,
    /// `Test` for the foo archive
    pub test: NodeId,
    /// `LocalRun` for libc, a dependency of foo
    pub libc_run: NodeId,
}

/// Graph with one archive producing two packages, plus a libc dependency.
/// Artifacts live under `root/RPMS` and are not created.
pub fn archive_graph(root: &Path) -> (SharedGraph, ArchiveGraph) {
    let archive = root.join("SRPMS/foo-1.0.src.rpm");
    let rpm = |name: &str| root.join("RPMS").join(format!("{name}.rpm"));
    let node = |name: &str, node_type: NodeType| {
        PackageNode::new(PackageVer::new(name, "1.0"), node_type)
            .with_architecture("x86_64")
            .with_archive(&archive)
    };

    let mut graph = PackageGraph::new();
    let libc_run = graph.add_node(
        PackageNode::new(PackageVer::new("libc", "2.38"), NodeType::LocalRun)
            .with_archive(root.join("SRPMS/libc-2.38.src.rpm"))
            .with_artifact(rpm("libc-2.38")),
    );
    let build = graph.add_node(node("foo", NodeType::LocalBuild).with_artifact(rpm("foo-1.0")));
    let sibling_build =
        graph.add_node(node("foo-devel", NodeType::LocalBuild).with_artifact(rpm("foo-devel-1.0")));
    let run = graph.add_node(node("foo", NodeType::LocalRun).with_artifact(rpm("foo-1.0")));
    let sibling_run =
        graph.add_node(node("foo-devel", NodeType::LocalRun).with_artifact(rpm("foo-devel-1.0")));
    let test = graph.add_node(node("foo", NodeType::Test));

    graph.add_edge(build, libc_run).unwrap();
    graph.add_edge(run, build).unwrap();
    graph.add_edge(sibling_run, sibling_build).unwrap();
    graph.add_edge(test, run).unwrap();

    let ids = ArchiveGraph {
        build,
        sibling_build,
        run,
        sibling_run,
        test,
        libc_run,
    };
    (SharedGraph::new(graph), ids)
}

/// Create every artifact the foo archive is expected to produce
pub async fn create_artifacts(root: &Path) {
    let rpms = root.join("RPMS");
    tokio::fs::create_dir_all(&rpms).await.unwrap();
    for name in ["foo-1.0.rpm", "foo-devel-1.0.rpm"] {
        tokio::fs::write(rpms.join(name), b"rpm").await.unwrap();
    }
}
