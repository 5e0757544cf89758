//! Fixed-size pool of build workers

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::channels::{StopReason, WorkerChannels};
use crate::error::SchedulerError;
use crate::worker::BuildWorker;

/// Tokio tasks running the worker loop over one shared channel set
pub struct BuildPool {
    workers: JoinSet<StopReason>,
    size: usize,
}

impl BuildPool {
    /// Spawn `size` worker loops (minimum 1) sharing `worker` and `channels`.
    ///
    /// The passed channel handle is dropped once every loop holds a clone,
    /// so the result stream closes when the last worker exits.
    pub fn spawn(size: usize, worker: Arc<BuildWorker>, channels: WorkerChannels) -> Self {
        let size = size.max(1);
        let mut workers = JoinSet::new();

        for index in 0..size {
            let worker = Arc::clone(&worker);
            let channels = channels.clone();
            workers.spawn(async move { worker.run(index, channels).await });
        }

        info!(workers = size, "Started build worker pool");
        Self { workers, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for every worker to stop.
    ///
    /// Stop reasons are returned in completion order. A worker that panicked
    /// or was aborted is an error, reported after the others have finished.
    pub async fn join(mut self) -> Result<Vec<StopReason>, SchedulerError> {
        let mut reasons = Vec::with_capacity(self.size);
        let mut failure = None;

        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(reason) => reasons.push(reason),
                Err(e) => {
                    error!(error = %e, "Build worker terminated abnormally");
                    failure.get_or_insert(SchedulerError::WorkerPanicked(e.to_string()));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(reasons),
        }
    }

    /// Abort every worker, including ones in the middle of a request
    pub fn abort(&mut self) {
        self.workers.abort_all();
    }
}
