//! distbuild scheduler - concurrent package build engine
//!
//! This crate provides the worker pool that builds and tests package graph
//! nodes: two-tier request selection with cancel and done signals, cache
//! reuse, dependency resolution, retries and check-section verdicts.

pub mod agent;
pub mod channels;
pub mod check;
pub mod deps;
pub mod error;
pub mod executor;
pub mod pool;
pub mod reporter;
pub mod request;
pub mod retry;
pub mod worker;

#[cfg(test)]
mod testing;

pub use agent::{AgentError, AgentOutput, BuildAgent};
pub use channels::{build_channels, DispatchChannels, Selection, StopReason, WorkerChannels};
pub use check::{parse_check_section, CheckVerdict};
pub use deps::resolve_dependencies;
pub use error::{Result, SchedulerError};
pub use executor::{BuildOutcome, NodeExecutor, TestOutcome};
pub use pool::BuildPool;
pub use reporter::{
    BuildEvent, BuildReporter, BuildReporterRegistry, CollectingReporter, SkipReason,
    TracingReporter,
};
pub use request::{BuildRequest, BuildResult};
pub use retry::RetryPolicy;
pub use worker::BuildWorker;
