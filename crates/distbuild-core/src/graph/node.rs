//! Package graph node model

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::PackageVer;

/// Sentinel artifact path for nodes that produce nothing
pub const NO_ARTIFACT_PATH: &str = "<NO_ARTIFACT_PATH>";

/// Index of a node within its [`PackageGraph`](super::PackageGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Role a node plays in the package graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// A package that must be compiled locally
    LocalBuild,
    /// The post-build check phase of a package
    Test,
    /// A locally produced runtime package
    LocalRun,
    /// A synthetic node grouping a set of targets
    Goal,
    /// A runtime package provided by an external repository
    RemoteRun,
    /// A meta node with no artifact of its own
    PureMeta,
    /// A runtime package that is already available
    PreBuilt,
    /// Not resolved by the graph builder
    Unknown,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalBuild => "local_build",
            Self::Test => "test",
            Self::LocalRun => "local_run",
            Self::Goal => "goal",
            Self::RemoteRun => "remote_run",
            Self::PureMeta => "pure_meta",
            Self::PreBuilt => "prebuilt",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Not yet evaluated
    #[default]
    Unknown,
    /// Meta node, nothing to do
    Meta,
    /// Needs to be built
    Build,
    /// Needs an incremental rebuild
    Delta,
    /// Artifacts are available from a previous run
    Cached,
    /// Built and current
    UpToDate,
    /// Could not be resolved
    Unresolved,
    /// Build or test failed
    BuildError,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Meta => "meta",
            Self::Build => "build",
            Self::Delta => "delta",
            Self::Cached => "cached",
            Self::UpToDate => "up_to_date",
            Self::Unresolved => "unresolved",
            Self::BuildError => "build_error",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the package graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    /// Position in the owning graph, assigned on insertion
    #[serde(default = "unassigned_id")]
    pub id: NodeId,
    /// Package name and version
    pub versioned_pkg: PackageVer,
    /// Target architecture (e.g. "x86_64", "noarch")
    pub architecture: String,
    /// Role of the node in the graph
    pub node_type: NodeType,
    /// Current build state
    #[serde(default)]
    pub state: NodeState,
    /// Source package archive this node is built from
    pub archive_path: PathBuf,
    /// Artifact this node produces, or [`NO_ARTIFACT_PATH`]
    pub artifact_path: PathBuf,
}

fn unassigned_id() -> NodeId {
    NodeId(usize::MAX)
}

impl PackageNode {
    /// Create a node with no artifact; use the builder methods to fill it in
    pub fn new(versioned_pkg: PackageVer, node_type: NodeType) -> Self {
        Self {
            id: unassigned_id(),
            versioned_pkg,
            architecture: "noarch".to_string(),
            node_type,
            state: NodeState::Unknown,
            archive_path: PathBuf::new(),
            artifact_path: PathBuf::from(NO_ARTIFACT_PATH),
        }
    }

    pub fn with_architecture(mut self, arch: impl Into<String>) -> Self {
        self.architecture = arch.into();
        self
    }

    pub fn with_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = path.into();
        self
    }

    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = path.into();
        self
    }

    pub fn with_state(mut self, state: NodeState) -> Self {
        self.state = state;
        self
    }

    /// Whether the node produces a real artifact
    pub fn has_artifact(&self) -> bool {
        has_artifact(&self.artifact_path)
    }

    /// File name of the source archive, used for log naming
    pub fn archive_file_name(&self) -> String {
        self.archive_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// True unless the path is empty or the "no artifact" sentinel
pub fn has_artifact(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path != Path::new(NO_ARTIFACT_PATH)
}

impl fmt::Display for PackageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) <{}>",
            self.versioned_pkg, self.architecture, self.node_type
        )
    }
}
