//! Build agent contract
//!
//! A build agent runs a single package build or test (local chroot, remote
//! agent, container). The scheduler treats it as a black box and only relies
//! on the contract below.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Files produced by a successful agent invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentOutput {
    /// Artifacts built by the invocation (empty for test runs)
    pub built_files: Vec<PathBuf>,
    /// Log written by the invocation
    pub log_file: PathBuf,
}

/// A failed agent invocation
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AgentError {
    /// What went wrong
    pub message: String,
    /// Log written before the failure, if any
    pub log_file: Option<PathBuf>,
}

impl AgentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            log_file: None,
        }
    }

    pub fn with_log(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = Some(log_file.into());
        self
    }
}

/// Backend that builds or tests a single source package.
///
/// Implementations must tolerate being called again for the same package
/// after a failure, and must always write the log to a path derived from
/// `log_base_name`, even when the invocation fails.
#[async_trait]
pub trait BuildAgent: Send + Sync {
    /// Short identifier for logs (e.g. "chroot", "container")
    fn name(&self) -> &'static str;

    /// Build `archive` for `target_arch` with `dependencies` installed.
    /// When `run_check` is set, only the check section is run.
    async fn build_package(
        &self,
        archive: &Path,
        log_base_name: &str,
        target_arch: &str,
        run_check: bool,
        dependencies: &[PathBuf],
    ) -> Result<AgentOutput, AgentError>;
}
