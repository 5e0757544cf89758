//! Request and result channels between a dispatcher and the worker pool
//!
//! The dispatcher owns every sending end for requests and signals and the
//! receiving end for results. Workers share one intake holding the request
//! receivers, so only one idle worker waits on the request streams at a time
//! and the others queue on the intake lock.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::{SendError, TryRecvError};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, trace, warn};

use crate::request::{BuildRequest, BuildResult};

/// Create a connected channel set.
///
/// Request and result channels are bounded to `capacity` (minimum 1).
pub fn build_channels(capacity: usize) -> (DispatchChannels, WorkerChannels) {
    let capacity = capacity.max(1);
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (priority_tx, priority_rx) = mpsc::channel(capacity);
    let (result_tx, result_rx) = mpsc::channel(capacity);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (done_tx, done_rx) = watch::channel(false);

    let dispatch = DispatchChannels {
        requests: request_tx,
        priority_requests: priority_tx,
        results: result_rx,
        cancel: cancel_tx,
        done: done_tx,
    };

    let workers = WorkerChannels {
        intake: Arc::new(Mutex::new(Intake {
            requests: request_rx,
            priority_requests: priority_rx,
            cancel: cancel_rx.clone(),
            done: done_rx,
            requests_open: true,
            priority_open: true,
            cancel_open: true,
            done_open: true,
        })),
        results: result_tx,
        cancel: cancel_rx,
    };

    (dispatch, workers)
}

/// Dispatcher side of the channel set
pub struct DispatchChannels {
    requests: mpsc::Sender<BuildRequest>,
    priority_requests: mpsc::Sender<BuildRequest>,
    results: mpsc::Receiver<BuildResult>,
    cancel: watch::Sender<bool>,
    done: watch::Sender<bool>,
}

impl DispatchChannels {
    /// Queue a normal request
    pub async fn submit(&self, request: BuildRequest) -> Result<(), SendError<BuildRequest>> {
        self.requests.send(request).await
    }

    /// Queue a request ahead of all normal requests
    pub async fn submit_priority(
        &self,
        request: BuildRequest,
    ) -> Result<(), SendError<BuildRequest>> {
        self.priority_requests.send(request).await
    }

    /// Wait for the next result. Returns `None` once every worker has exited.
    pub async fn next_result(&mut self) -> Option<BuildResult> {
        self.results.recv().await
    }

    /// Take a result if one is ready
    pub fn try_next_result(&mut self) -> Option<BuildResult> {
        self.results.try_recv().ok()
    }

    /// Stop workers before they pick up more work.
    ///
    /// Requests already being processed run to completion.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Signal that no more requests will be submitted.
    ///
    /// Workers exit once the queued requests are drained.
    pub fn finish(&self) {
        self.done.send_replace(true);
    }
}

impl fmt::Debug for DispatchChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchChannels")
            .field("cancelled", &*self.cancel.borrow())
            .field("done", &*self.done.borrow())
            .finish()
    }
}

/// Why a worker stopped selecting requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The cancel signal fired
    Cancelled,
    /// The done signal fired and no requests were pending
    Done,
    /// Both request streams were closed and drained
    Closed,
}

/// Outcome of [`WorkerChannels::select_next`]
#[derive(Debug, PartialEq, Eq)]
pub enum Selection {
    /// A request to process
    Request {
        request: BuildRequest,
        priority: bool,
    },
    /// The worker should exit
    Stop(StopReason),
}

/// Worker side of the channel set, shared by every worker in a pool
#[derive(Clone)]
pub struct WorkerChannels {
    intake: Arc<Mutex<Intake>>,
    results: mpsc::Sender<BuildResult>,
    cancel: watch::Receiver<bool>,
}

impl WorkerChannels {
    /// Pick the next request.
    ///
    /// Cancellation always wins, even over queued requests. Priority requests
    /// are always taken before normal ones. The done signal only stops the
    /// worker once both request queues are empty.
    pub async fn select_next(&self) -> Selection {
        if *self.cancel.borrow() {
            warn!("Cancellation signal received");
            return Selection::Stop(StopReason::Cancelled);
        }

        let mut intake = self.intake.lock().await;
        intake.next().await
    }

    /// Publish a result to the dispatcher
    pub async fn publish(&self, result: BuildResult) -> Result<(), SendError<BuildResult>> {
        self.results.send(result).await
    }

    /// Whether the cancel signal has fired
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

impl fmt::Debug for WorkerChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerChannels")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

struct Intake {
    requests: mpsc::Receiver<BuildRequest>,
    priority_requests: mpsc::Receiver<BuildRequest>,
    cancel: watch::Receiver<bool>,
    done: watch::Receiver<bool>,
    requests_open: bool,
    priority_open: bool,
    cancel_open: bool,
    done_open: bool,
}

enum Wake {
    Cancel(bool),
    Priority(Option<BuildRequest>),
    Normal(Option<BuildRequest>),
    Done(bool),
}

impl Intake {
    async fn next(&mut self) -> Selection {
        loop {
            if *self.cancel.borrow() {
                warn!("Cancellation signal received");
                return Selection::Stop(StopReason::Cancelled);
            }

            if let Some(request) = try_take(&mut self.priority_requests, &mut self.priority_open) {
                trace!(node = %request.node, "PRIORITY REQUEST");
                return Selection::Request {
                    request,
                    priority: true,
                };
            }

            if let Some(request) = try_take(&mut self.requests, &mut self.requests_open) {
                trace!(node = %request.node, "normal REQUEST");
                return Selection::Request {
                    request,
                    priority: false,
                };
            }

            if !self.priority_open && !self.requests_open {
                debug!("Request channels closed");
                return Selection::Stop(StopReason::Closed);
            }

            if *self.done.borrow() {
                debug!("Worker finished signal received");
                return Selection::Stop(StopReason::Done);
            }

            let Intake {
                requests,
                priority_requests,
                cancel,
                done,
                requests_open,
                priority_open,
                cancel_open,
                done_open,
            } = &mut *self;

            let wake = tokio::select! {
                biased;
                changed = cancel.changed(), if *cancel_open => Wake::Cancel(changed.is_ok()),
                request = priority_requests.recv(), if *priority_open => Wake::Priority(request),
                request = requests.recv(), if *requests_open => Wake::Normal(request),
                changed = done.changed(), if *done_open => Wake::Done(changed.is_ok()),
            };

            match wake {
                Wake::Cancel(open) => *cancel_open = open,
                Wake::Done(open) => *done_open = open,
                Wake::Priority(Some(request)) => {
                    trace!(node = %request.node, "PRIORITY REQUEST");
                    return Selection::Request {
                        request,
                        priority: true,
                    };
                }
                Wake::Priority(None) => *priority_open = false,
                Wake::Normal(Some(request)) => {
                    trace!(node = %request.node, "normal REQUEST");
                    return Selection::Request {
                        request,
                        priority: false,
                    };
                }
                Wake::Normal(None) => *requests_open = false,
            }
        }
    }
}

fn try_take(rx: &mut mpsc::Receiver<BuildRequest>, open: &mut bool) -> Option<BuildRequest> {
    if !*open {
        return None;
    }
    match rx.try_recv() {
        Ok(request) => Some(request),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => {
            *open = false;
            None
        }
    }
}
