//! Per-request build and test logic
//!
//! The executor decides between reusing cached artifacts and invoking the
//! build agent, resolves dependencies, and applies the retry policy. It never
//! writes graph state; the worker does that once the outcome is known.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use distbuild_core::{IgnoreList, PackageNode, SchedulerConfig, SharedGraph};
use tracing::{debug, info, instrument, warn};

use crate::agent::{AgentOutput, BuildAgent};
use crate::check::{build_log_name, parse_check_section, test_log_name, CheckVerdict};
use crate::deps::resolve_dependencies;
use crate::error::SchedulerError;
use crate::reporter::{BuildEvent, BuildReporter, SkipReason, TracingReporter};
use crate::retry::RetryPolicy;

/// Outcome of the build path
#[derive(Debug, Default)]
pub struct BuildOutcome {
    /// Cached artifacts were reused
    pub used_cache: bool,
    /// The package is on the ignore list
    pub ignored: bool,
    /// Artifacts produced or reused
    pub built_files: Vec<PathBuf>,
    /// Log of the last agent invocation
    pub log_file: Option<PathBuf>,
    /// Infrastructure failure after all attempts
    pub error: Option<SchedulerError>,
}

/// Outcome of the test path
#[derive(Debug, Default)]
pub struct TestOutcome {
    /// The package is on the ignore list
    pub ignored: bool,
    /// The check section reported a failure; not an error
    pub check_failed: bool,
    /// Log of the last agent invocation
    pub log_file: Option<PathBuf>,
    /// Infrastructure failure after all attempts
    pub error: Option<SchedulerError>,
}

/// Runs the build and test paths for single nodes
pub struct NodeExecutor {
    agent: Arc<dyn BuildAgent>,
    graph: SharedGraph,
    build_retry: RetryPolicy,
    check_retry: RetryPolicy,
    ignored: IgnoreList,
    require_check_marker: bool,
    reporter: Arc<dyn BuildReporter>,
}

impl NodeExecutor {
    /// Create an executor with single attempts and an empty ignore list
    pub fn new(agent: Arc<dyn BuildAgent>, graph: SharedGraph) -> Self {
        Self {
            agent,
            graph,
            build_retry: RetryPolicy::default(),
            check_retry: RetryPolicy::default(),
            ignored: IgnoreList::default(),
            require_check_marker: false,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Create an executor from scheduler configuration
    pub fn from_config(
        agent: Arc<dyn BuildAgent>,
        graph: SharedGraph,
        config: &SchedulerConfig,
    ) -> Self {
        Self::new(agent, graph)
            .with_build_retry(RetryPolicy::new(config.build_attempts, config.retry_delay()))
            .with_check_retry(RetryPolicy::new(config.check_attempts, config.retry_delay()))
            .with_ignore_list(config.ignore_list())
            .with_require_check_marker(config.require_check_marker)
    }

    pub fn with_build_retry(mut self, policy: RetryPolicy) -> Self {
        self.build_retry = policy;
        self
    }

    pub fn with_check_retry(mut self, policy: RetryPolicy) -> Self {
        self.check_retry = policy;
        self
    }

    pub fn with_ignore_list(mut self, ignored: IgnoreList) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn with_require_check_marker(mut self, require: bool) -> Self {
        self.require_check_marker = require;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn BuildReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    pub fn reporter(&self) -> &Arc<dyn BuildReporter> {
        &self.reporter
    }

    /// Build a `LocalBuild` node, or reuse its cached artifacts when allowed.
    #[instrument(skip_all, fields(node = %node.versioned_pkg))]
    pub async fn execute_build(&self, node: &PackageNode, can_use_cache: bool) -> BuildOutcome {
        let archive_name = node.archive_file_name();
        let prebuilt = self.graph.is_prebuilt(&node.archive_path).await;

        if self.ignored.contains(&node.versioned_pkg) {
            debug!("{} explicitly marked to be ignored.", archive_name);
            self.skip(node, SkipReason::Ignored);
            return BuildOutcome {
                used_cache: prebuilt.valid,
                ignored: true,
                built_files: prebuilt.existing,
                ..Default::default()
            };
        }

        if can_use_cache && prebuilt.valid {
            debug!("{} is prebuilt, skipping", archive_name);
            self.skip(node, SkipReason::Cached);
            return BuildOutcome {
                used_cache: true,
                built_files: prebuilt.existing,
                ..Default::default()
            };
        }

        if prebuilt.is_partial() {
            self.reporter.report(&BuildEvent::PartialBuild {
                node: node.to_string(),
                missing: prebuilt.missing.clone(),
            });
        }

        let dependencies = match resolve_dependencies(&self.graph, node.id).await {
            Ok(deps) => deps,
            Err(e) => {
                return BuildOutcome {
                    error: Some(e.into()),
                    ..Default::default()
                }
            }
        };

        info!("Building: {}", archive_name);
        let log_name = build_log_name(&archive_name);
        let result = self
            .build_retry
            .run(|attempt| self.call_agent(node, &log_name, false, &dependencies, attempt))
            .await;

        match result {
            Ok(output) => BuildOutcome {
                built_files: output.built_files,
                log_file: Some(output.log_file),
                ..Default::default()
            },
            Err(e) => BuildOutcome {
                log_file: e.log_file().map(Path::to_path_buf),
                error: Some(e),
                ..Default::default()
            },
        }
    }

    /// Run the check section of a `Test` node.
    ///
    /// `deps_cached` means every dependency came from cache, in which case
    /// the test is skipped. A failing check section is reported but is not
    /// returned as an error.
    #[instrument(skip_all, fields(node = %node.versioned_pkg))]
    pub async fn execute_test(&self, node: &PackageNode, deps_cached: bool) -> TestOutcome {
        let archive_name = node.archive_file_name();

        if self.ignored.contains(&node.versioned_pkg) {
            debug!("{} (test) explicitly marked to be ignored.", archive_name);
            self.skip(node, SkipReason::Ignored);
            return TestOutcome {
                ignored: true,
                ..Default::default()
            };
        }

        if deps_cached {
            debug!(
                "All dependencies for '{}' were prebuilt, skipping its test.",
                archive_name
            );
            self.skip(node, SkipReason::DependenciesCached);
            return TestOutcome::default();
        }

        let dependencies = match resolve_dependencies(&self.graph, node.id).await {
            Ok(deps) => deps,
            Err(e) => {
                return TestOutcome {
                    error: Some(e.into()),
                    ..Default::default()
                }
            }
        };

        info!("Testing: {}", archive_name);
        let log_name = test_log_name(&archive_name);
        let log_name = log_name.as_str();
        let dependencies = dependencies.as_slice();
        let require_marker = self.require_check_marker;
        let label = node.to_string();
        let label = label.as_str();

        let result = self
            .check_retry
            .run(move |attempt| async move {
                let output = self
                    .call_agent(node, log_name, true, dependencies, attempt)
                    .await
                    .map_err(|e| {
                        warn!(
                            "Test build for '{}' failed on a non-test build issue. Error: {}",
                            node.archive_path.display(),
                            e
                        );
                        e
                    })?;

                let verdict = parse_check_section(&output.log_file).await?;
                if let CheckVerdict::Failed { line, archived_log } = &verdict {
                    self.reporter.report(&BuildEvent::TestFailed {
                        node: label.to_string(),
                        line: line.clone(),
                        archived_log: archived_log.clone(),
                    });
                }
                verdict.into_result(&output.log_file, require_marker)?;
                Ok::<_, SchedulerError>(output.log_file)
            })
            .await;

        match result {
            Ok(log_file) => TestOutcome {
                log_file: Some(log_file),
                ..Default::default()
            },
            Err(e) if e.is_check_failure() => {
                warn!(
                    "Tests failed for '{}'. Error: {}",
                    node.archive_path.display(),
                    e
                );
                TestOutcome {
                    check_failed: true,
                    log_file: e.log_file().map(Path::to_path_buf),
                    ..Default::default()
                }
            }
            Err(e) => TestOutcome {
                log_file: e.log_file().map(Path::to_path_buf),
                error: Some(e),
                ..Default::default()
            },
        }
    }

    /// Single agent invocation, mapping failures into scheduler errors
    async fn call_agent(
        &self,
        node: &PackageNode,
        log_name: &str,
        run_check: bool,
        dependencies: &[PathBuf],
        attempt: usize,
    ) -> Result<AgentOutput, SchedulerError> {
        self.agent
            .build_package(
                &node.archive_path,
                log_name,
                &node.architecture,
                run_check,
                dependencies,
            )
            .await
            .map_err(|e| {
                let max_attempts = if run_check {
                    self.check_retry.max_attempts()
                } else {
                    self.build_retry.max_attempts()
                };
                self.reporter.report(&BuildEvent::AttemptFailed {
                    node: node.to_string(),
                    attempt,
                    max_attempts,
                    error: e.message.clone(),
                });
                SchedulerError::Agent {
                    archive: node.archive_path.clone(),
                    message: e.message,
                    log_file: e.log_file,
                }
            })
    }

    fn skip(&self, node: &PackageNode, reason: SkipReason) {
        self.reporter.report(&BuildEvent::Skipped {
            node: node.to_string(),
            reason,
        });
    }
}
