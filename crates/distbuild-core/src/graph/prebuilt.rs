//! Cache validity of previously built artifacts

use std::path::PathBuf;

use tracing::debug;

/// Outcome of checking a source archive's expected artifacts on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrebuiltStatus {
    /// Every expected artifact exists
    pub valid: bool,
    /// Expected artifacts found on disk
    pub existing: Vec<PathBuf>,
    /// Expected artifacts not found on disk
    pub missing: Vec<PathBuf>,
}

impl PrebuiltStatus {
    /// Some but not all expected artifacts are present
    pub fn is_partial(&self) -> bool {
        !self.existing.is_empty() && !self.missing.is_empty()
    }

    /// Check which of the expected artifacts exist
    pub async fn check(expected: Vec<PathBuf>) -> Self {
        let mut existing = Vec::new();
        let mut missing = Vec::new();

        for path in expected {
            match tokio::fs::try_exists(&path).await {
                Ok(true) => existing.push(path),
                Ok(false) => missing.push(path),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "unable to stat artifact");
                    missing.push(path);
                }
            }
        }

        Self {
            valid: missing.is_empty(),
            existing,
            missing,
        }
    }
}
