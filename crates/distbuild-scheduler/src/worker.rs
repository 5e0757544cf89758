//! Build node worker loop

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use distbuild_core::{NodeState, NodeType, SchedulerConfig, SharedGraph};
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::agent::BuildAgent;
use crate::channels::{Selection, StopReason, WorkerChannels};
use crate::error::SchedulerError;
use crate::executor::NodeExecutor;
use crate::reporter::{BuildEvent, BuildReporter, SkipReason};
use crate::request::{BuildRequest, BuildResult};

/// Processes build requests until told to stop.
///
/// One worker value can drive any number of concurrent loops; the pool shares
/// it behind an `Arc`.
pub struct BuildWorker {
    executor: NodeExecutor,
}

impl BuildWorker {
    pub fn new(executor: NodeExecutor) -> Self {
        Self { executor }
    }

    /// Create a worker from scheduler configuration
    pub fn from_config(
        agent: Arc<dyn BuildAgent>,
        graph: SharedGraph,
        config: &SchedulerConfig,
    ) -> Self {
        Self::new(NodeExecutor::from_config(agent, graph, config))
    }

    fn reporter(&self) -> &dyn BuildReporter {
        &**self.executor.reporter()
    }

    /// Run the worker loop.
    ///
    /// Exactly one result is published for every request taken off the
    /// channels, including requests whose processing panics. Cancellation is
    /// only observed between requests, so a running build always finishes
    /// first.
    #[instrument(skip_all, fields(worker = index))]
    pub async fn run(&self, index: usize, channels: WorkerChannels) -> StopReason {
        self.reporter()
            .report(&BuildEvent::WorkerStarted { worker: index });

        let reason = loop {
            let (request, priority) = match channels.select_next().await {
                Selection::Request { request, priority } => (request, priority),
                Selection::Stop(reason) => break reason,
            };

            self.reporter().report(&BuildEvent::RequestStarted {
                worker: index,
                node: request.node,
                priority,
            });

            let result = match AssertUnwindSafe(self.process(&request))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    self.recover_from_panic(&request, message).await
                }
            };
            if channels.publish(result).await.is_err() {
                warn!("Result channel closed, stopping worker");
                break StopReason::Closed;
            }
        };

        self.reporter().report(&BuildEvent::WorkerStopped {
            worker: index,
            reason,
        });
        reason
    }

    /// Execute a single request and produce its result
    pub async fn process(&self, request: &BuildRequest) -> BuildResult {
        let start = Instant::now();
        let mut result = BuildResult::for_request(request);
        let graph = self.executor.graph();

        let label;
        match graph.node(request.node).await {
            None => {
                label = request.node.to_string();
                result.error = Some(SchedulerError::NodeNotFound(request.node));
            }
            Some(node) => {
                label = node.to_string();
                match node.node_type {
                    NodeType::LocalBuild => {
                        let outcome = self
                            .executor
                            .execute_build(&node, request.can_use_cache)
                            .await;
                        result.used_cache = outcome.used_cache;
                        result.ignored = outcome.ignored;
                        result.built_files = outcome.built_files;
                        result.log_file = outcome.log_file;
                        result.error = outcome.error;
                        self.set_ancillary_status(request, &result).await;
                    }
                    NodeType::Test => {
                        let outcome = self
                            .executor
                            .execute_test(&node, request.can_use_cache)
                            .await;
                        result.ignored = outcome.ignored;
                        result.check_failed = outcome.check_failed;
                        result.log_file = outcome.log_file;
                        result.error = outcome.error;
                        self.set_ancillary_status(request, &result).await;
                    }
                    NodeType::LocalRun
                    | NodeType::Goal
                    | NodeType::RemoteRun
                    | NodeType::PureMeta
                    | NodeType::PreBuilt => {
                        result.used_cache = request.can_use_cache;
                        self.reporter().report(&BuildEvent::Skipped {
                            node: label.clone(),
                            reason: SkipReason::PassThrough,
                        });
                    }
                    NodeType::Unknown => {
                        result.error = Some(SchedulerError::InvalidNodeType {
                            node_type: node.node_type,
                            node: label.clone(),
                        });
                    }
                }
            }
        }

        let duration = start.elapsed();
        match &result.error {
            None => self.reporter().report(&BuildEvent::Completed {
                node: label,
                duration,
                used_cache: result.used_cache,
                ignored: result.ignored,
            }),
            Some(e) => self.reporter().report(&BuildEvent::Failed {
                node: label,
                duration,
                error: e.to_string(),
            }),
        }

        result
    }

    /// Failed result for a request whose processing panicked
    async fn recover_from_panic(&self, request: &BuildRequest, message: String) -> BuildResult {
        error!(node = %request.node, %message, "Build request panicked");

        let error = SchedulerError::RequestPanicked {
            node: request.node,
            message,
        };
        self.reporter().report(&BuildEvent::Failed {
            node: request.node.to_string(),
            duration: Duration::ZERO,
            error: error.to_string(),
        });

        let mut result = BuildResult::for_request(request);
        result.error = Some(error);
        self.set_ancillary_status(request, &result).await;
        result
    }

    /// Mark the request's ancillary build nodes with the outcome
    async fn set_ancillary_status(&self, request: &BuildRequest, result: &BuildResult) {
        let state = if result.error.is_none() {
            NodeState::UpToDate
        } else {
            NodeState::BuildError
        };
        let updated = self
            .executor
            .graph()
            .set_build_states(&request.ancillary_nodes, state)
            .await;
        debug!(node = %request.node, %state, updated, "updated ancillary node states");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
