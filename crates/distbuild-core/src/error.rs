//! Error types for distbuild

use std::path::PathBuf;
use thiserror::Error;

use crate::graph::NodeId;

/// Result type alias using DistbuildError
pub type Result<T> = std::result::Result<T, DistbuildError>;

/// Main error type for distbuild core operations
#[derive(Debug, Error)]
pub enum DistbuildError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Package graph errors
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Package graph errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// No node with this id exists in the graph
    #[error("Node {0} not found in package graph")]
    NodeNotFound(NodeId),

    /// An edge referenced a node outside the graph
    #[error("Edge {from} -> {to} references a node outside the graph")]
    EdgeOutOfRange { from: NodeId, to: NodeId },
}

impl DistbuildError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}
