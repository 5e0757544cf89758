//! Configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{IgnoreList, PackageVer};

use super::defaults;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of concurrent build workers
    pub workers: usize,

    /// Maximum attempts for a package build
    pub build_attempts: usize,

    /// Maximum attempts for a package test run
    pub check_attempts: usize,

    /// Fixed delay between attempts, in milliseconds
    pub retry_delay_ms: u64,

    /// Capacity of the request and result channels
    pub channel_capacity: usize,

    /// Fail tests whose log has no check verdict line
    pub require_check_marker: bool,

    /// Packages that are never built or tested
    pub ignored_packages: Vec<PackageVer>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: defaults::default_workers(),
            build_attempts: defaults::DEFAULT_BUILD_ATTEMPTS,
            check_attempts: defaults::DEFAULT_CHECK_ATTEMPTS,
            retry_delay_ms: defaults::DEFAULT_RETRY_DELAY_MS,
            channel_capacity: defaults::DEFAULT_CHANNEL_CAPACITY,
            require_check_marker: false,
            ignored_packages: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Delay between retry attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Ignored packages as a lookup list
    pub fn ignore_list(&self) -> IgnoreList {
        self.ignored_packages.iter().cloned().collect()
    }
}
