//! distbuild core - package graph and shared types
//!
//! This crate provides the package graph consumed by the build scheduler,
//! the concurrency-safe handle workers share, the ignore list, error types
//! and scheduler configuration.

pub mod config;
pub mod error;
pub mod graph;
pub mod types;

pub use config::SchedulerConfig;
pub use error::{ConfigError, DistbuildError, GraphError, Result};
pub use graph::{
    NodeId, NodeState, NodeType, PackageGraph, PackageNode, PrebuiltStatus, SharedGraph,
    NO_ARTIFACT_PATH,
};
pub use types::{IgnoreList, PackageVer};
