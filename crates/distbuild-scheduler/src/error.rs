//! Error types for the build scheduler

use std::path::{Path, PathBuf};

use distbuild_core::{GraphError, NodeId, NodeType};
use thiserror::Error;

/// Result type alias using SchedulerError
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors produced while processing a build request
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The build agent could not run the package (after all retries)
    #[error("Build agent failed on '{}': {message}", .archive.display())]
    Agent {
        archive: PathBuf,
        message: String,
        log_file: Option<PathBuf>,
    },

    /// A test log could not be read
    #[error("Failed to read test log '{}': {source}", .path.display())]
    LogUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The check section reported a failing status
    #[error("package test failed. Test status line: {line}")]
    CheckFailed { line: String, log_file: PathBuf },

    /// A node type the worker cannot process reached the worker
    #[error("invalid node type {node_type} on node {node}")]
    InvalidNodeType { node_type: NodeType, node: String },

    /// The request referenced a node missing from the graph
    #[error("request references node {0} which is not in the package graph")]
    NodeNotFound(NodeId),

    /// Processing a request panicked; the worker recovered and kept running
    #[error("processing node {node} panicked: {message}")]
    RequestPanicked { node: NodeId, message: String },

    /// A worker task panicked or was aborted
    #[error("Build worker terminated abnormally: {0}")]
    WorkerPanicked(String),

    /// Package graph errors
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl SchedulerError {
    /// Whether this error comes from a failing check section rather than
    /// from the build infrastructure
    pub fn is_check_failure(&self) -> bool {
        matches!(self, Self::CheckFailed { .. })
    }

    /// Log file associated with the failure, if any
    pub fn log_file(&self) -> Option<&Path> {
        match self {
            Self::Agent { log_file, .. } => log_file.as_deref(),
            Self::LogUnreadable { path, .. } => Some(path),
            Self::CheckFailed { log_file, .. } => Some(log_file),
            _ => None,
        }
    }

    /// Whether this error is a scheduling invariant violation
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvalidNodeType { .. } | Self::NodeNotFound(_))
    }
}
