//! Build requests and results

use std::path::PathBuf;

use distbuild_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// A unit of work submitted to the worker pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Node to build or test
    pub node: NodeId,
    /// Nodes whose state follows this request's outcome
    #[serde(default)]
    pub ancillary_nodes: Vec<NodeId>,
    /// Previously built artifacts may be reused
    #[serde(default)]
    pub can_use_cache: bool,
    /// Incremental build
    #[serde(default)]
    pub is_delta: bool,
}

impl BuildRequest {
    /// Create a request for a single node with no ancillary nodes
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            ancillary_nodes: Vec::new(),
            can_use_cache: false,
            is_delta: false,
        }
    }

    pub fn with_ancillary_nodes(mut self, nodes: Vec<NodeId>) -> Self {
        self.ancillary_nodes = nodes;
        self
    }

    pub fn with_cache(mut self, can_use_cache: bool) -> Self {
        self.can_use_cache = can_use_cache;
        self
    }

    pub fn with_delta(mut self, is_delta: bool) -> Self {
        self.is_delta = is_delta;
        self
    }
}

/// Outcome of a single build request
#[derive(Debug)]
pub struct BuildResult {
    /// Node the request was for
    pub node: NodeId,
    /// Echo of the request's ancillary nodes
    pub ancillary_nodes: Vec<NodeId>,
    /// Artifacts produced or reused
    pub built_files: Vec<PathBuf>,
    /// Failure, if any
    pub error: Option<SchedulerError>,
    /// Log of the last agent invocation
    pub log_file: Option<PathBuf>,
    /// The package is on the ignore list
    pub ignored: bool,
    /// Cached artifacts were used instead of building
    pub used_cache: bool,
    /// A test node's check section failed; not reported as an error
    pub check_failed: bool,
    /// Echo of the request's delta flag
    pub was_delta: bool,
}

impl BuildResult {
    /// Empty result echoing a request
    pub fn for_request(req: &BuildRequest) -> Self {
        Self {
            node: req.node,
            ancillary_nodes: req.ancillary_nodes.clone(),
            built_files: Vec::new(),
            error: None,
            log_file: None,
            ignored: false,
            used_cache: false,
            check_failed: false,
            was_delta: req.is_delta,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
