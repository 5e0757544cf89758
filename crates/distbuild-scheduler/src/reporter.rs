//! Build progress reporting

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use distbuild_core::NodeId;
use serde::Serialize;

use crate::channels::StopReason;

/// Why a request finished without invoking the build agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The package is on the ignore list
    Ignored,
    /// All expected artifacts were already built
    Cached,
    /// Every dependency of a test node came from cache
    DependenciesCached,
    /// Structural node with nothing to execute
    PassThrough,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Ignored => "explicitly ignored",
            Self::Cached => "prebuilt",
            Self::DependenciesCached => "all dependencies prebuilt",
            Self::PassThrough => "nothing to execute",
        };
        f.write_str(reason)
    }
}

/// Events emitted while workers process requests
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// A worker entered its loop
    WorkerStarted { worker: usize },
    /// A worker picked up a request
    RequestStarted {
        worker: usize,
        node: NodeId,
        priority: bool,
    },
    /// A request finished without invoking the agent
    Skipped { node: String, reason: SkipReason },
    /// Some but not all expected artifacts exist; rebuilding
    PartialBuild { node: String, missing: Vec<PathBuf> },
    /// An agent attempt failed
    AttemptFailed {
        node: String,
        attempt: usize,
        max_attempts: usize,
        error: String,
    },
    /// The check section reported a failure
    TestFailed {
        node: String,
        line: String,
        archived_log: Option<PathBuf>,
    },
    /// A request finished without error
    Completed {
        node: String,
        duration: Duration,
        used_cache: bool,
        ignored: bool,
    },
    /// A request finished with an error
    Failed {
        node: String,
        duration: Duration,
        error: String,
    },
    /// A worker left its loop
    WorkerStopped { worker: usize, reason: StopReason },
}

/// Trait for reporting build progress
pub trait BuildReporter: Send + Sync {
    /// Handle a build event
    fn report(&self, event: &BuildEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl BuildReporter for TracingReporter {
    fn report(&self, event: &BuildEvent) {
        match event {
            BuildEvent::WorkerStarted { worker } => {
                tracing::debug!(worker, "worker started");
            }
            BuildEvent::RequestStarted {
                worker,
                node,
                priority,
            } => {
                tracing::debug!(worker, priority, "picked up node {}", node);
            }
            BuildEvent::Skipped { node, reason } => {
                tracing::debug!("{} skipped: {}", node, reason);
            }
            BuildEvent::PartialBuild { node, missing } => {
                tracing::info!(
                    "{} is being rebuilt due to partially missing components: {:?}",
                    node,
                    missing
                );
            }
            BuildEvent::AttemptFailed {
                node,
                attempt,
                max_attempts,
                error,
            } => {
                tracing::warn!("{} attempt {}/{} failed: {}", node, attempt, max_attempts, error);
            }
            BuildEvent::TestFailed {
                node,
                line,
                archived_log,
            } => match archived_log {
                Some(log) => tracing::warn!(
                    "Tests failed for {}: {} (log saved to {})",
                    node,
                    line,
                    log.display()
                ),
                None => tracing::warn!("Tests failed for {}: {}", node, line),
            },
            BuildEvent::Completed {
                node,
                duration,
                used_cache,
                ignored,
            } => {
                if *ignored {
                    tracing::info!("{} ignored", node);
                } else if *used_cache {
                    tracing::info!("{} completed (cached) in {:.1}s", node, duration.as_secs_f64());
                } else {
                    tracing::info!("{} completed in {:.1}s", node, duration.as_secs_f64());
                }
            }
            BuildEvent::Failed {
                node,
                duration,
                error,
            } => {
                tracing::error!("{} failed after {:.1}s: {}", node, duration.as_secs_f64(), error);
            }
            BuildEvent::WorkerStopped { worker, reason } => {
                tracing::debug!(worker, ?reason, "Worker done");
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<BuildEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl BuildReporter for CollectingReporter {
    fn report(&self, event: &BuildEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans events out to several reporters
pub struct BuildReporterRegistry {
    reporters: Vec<Arc<dyn BuildReporter>>,
}

impl BuildReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register<R: BuildReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Arc::new(reporter));
    }

    pub fn register_shared(&mut self, reporter: Arc<dyn BuildReporter>) {
        self.reporters.push(reporter);
    }

    pub fn all(&self) -> &[Arc<dyn BuildReporter>] {
        &self.reporters
    }
}

impl BuildReporter for BuildReporterRegistry {
    fn report(&self, event: &BuildEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

impl Default for BuildReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::default();

        reporter.report(&BuildEvent::WorkerStarted { worker: 0 });
        reporter.report(&BuildEvent::Completed {
            node: "zlib".to_string(),
            duration: Duration::from_secs(5),
            used_cache: false,
            ignored: false,
        });

        assert_eq!(reporter.events().len(), 2);
    }

    #[test]
    fn test_tracing_reporter() {
        let reporter = TracingReporter;

        // Just verify it doesn't panic
        reporter.report(&BuildEvent::Skipped {
            node: "zlib".to_string(),
            reason: SkipReason::Cached,
        });
        reporter.report(&BuildEvent::TestFailed {
            node: "zlib".to_string(),
            line: "CHECK DONE EXIT STATUS 1".to_string(),
            archived_log: None,
        });
        reporter.report(&BuildEvent::WorkerStopped {
            worker: 1,
            reason: StopReason::Done,
        });
    }

    #[test]
    fn test_registry_broadcast() {
        let collecting = Arc::new(CollectingReporter::default());
        let mut registry = BuildReporterRegistry::empty();
        registry.register_shared(collecting.clone());
        registry.register(TracingReporter);

        registry.report(&BuildEvent::WorkerStarted { worker: 3 });

        assert_eq!(registry.all().len(), 2);
        assert_eq!(collecting.events().len(), 1);
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::Ignored.to_string(), "explicitly ignored");
        assert_eq!(
            SkipReason::DependenciesCached.to_string(),
            "all dependencies prebuilt"
        );
    }
}
