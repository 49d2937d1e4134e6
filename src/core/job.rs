//! Job and batch data model.
//!
//! A [`Job`] is one unit of remote work against a target; a [`Batch`] is an
//! ordered set of jobs converging on a single deadline window. Jobs become
//! [`ScheduledJob`]s only once the capacity negotiation for them succeeds,
//! and batches resolve atomically: a partially reserved batch is dropped.

use serde::{Deserialize, Serialize};

use crate::util::clock::fmt_clock;

/// Operation kind for a job, resolved by exhaustive matching everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Reduces the target's depletable value and raises its penalty level.
    Deplete,
    /// Restores the depletable value toward its ceiling, raising penalty.
    Replenish,
    /// Lowers the penalty level toward its floor; no effect on value.
    Suppress,
}

/// One unit of remote work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Operation kind.
    pub kind: OpKind,
    /// Target identifier this job acts against.
    pub target: String,
    /// Opaque label used for logging/debugging; encodes the end time.
    pub label: String,
    /// Thread count (always positive for emitted jobs).
    pub threads: u32,
    /// Capacity cost: thread count times the per-thread unit cost.
    pub ram: f64,
    /// Absolute start time, milliseconds since epoch.
    pub start_time_ms: u128,
    /// Absolute end time, milliseconds since epoch; always after the start.
    pub end_time_ms: u128,
    /// Argument payload passed through to the dispatcher.
    pub args: Vec<String>,
}

impl Job {
    /// Build a job, deriving its label, capacity cost, and argument payload.
    ///
    /// `tag` is the short stage marker embedded in the label (e.g. `D`, `R`,
    /// `S1`, `S2`).
    #[must_use]
    pub fn new(
        kind: OpKind,
        tag: &str,
        target: &str,
        threads: u32,
        unit_cost: f64,
        start_time_ms: u128,
        end_time_ms: u128,
    ) -> Self {
        let label = format!("{tag} - {}", fmt_clock(end_time_ms));
        let args = vec![
            "--target".to_string(),
            target.to_string(),
            "--id".to_string(),
            label.clone(),
        ];
        Self {
            kind,
            target: target.to_string(),
            label,
            threads,
            ram: f64::from(threads) * unit_cost,
            start_time_ms,
            end_time_ms,
            args,
        }
    }

    /// Copy of this job shifted forward by `cadence_ms`, with the label (and
    /// the trailing `--id` argument) regenerated from the new end time.
    #[must_use]
    pub fn shifted(&self, cadence_ms: u128) -> Self {
        let end_time_ms = self.end_time_ms + cadence_ms;
        let tag = self
            .label
            .rsplit_once(" - ")
            .map_or(self.label.as_str(), |(tag, _)| tag);
        let label = format!("{tag} - {}", fmt_clock(end_time_ms));
        let mut args = self.args.clone();
        if let Some(last) = args.last_mut() {
            last.clone_from(&label);
        }
        Self {
            label,
            start_time_ms: self.start_time_ms + cadence_ms,
            end_time_ms,
            args,
            ..self.clone()
        }
    }
}

/// An ordered list of jobs intended to execute together against one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Jobs in the order they must be reserved.
    pub jobs: Vec<Job>,
    /// Earliest job start in the batch.
    pub batch_start_ms: u128,
    /// Latest job end in the batch (the final suppress stage).
    pub batch_end_ms: u128,
}

impl Batch {
    /// Assemble a batch from jobs, deriving the start/end bounds.
    #[must_use]
    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        let batch_start_ms = jobs.iter().map(|j| j.start_time_ms).min().unwrap_or(0);
        let batch_end_ms = jobs.iter().map(|j| j.end_time_ms).max().unwrap_or(0);
        Self {
            jobs,
            batch_start_ms,
            batch_end_ms,
        }
    }
}

/// A job whose capacity negotiation succeeded, bound to an assigned host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// The reserved job.
    pub job: Job,
    /// Host the allocator assigned for the reservation window.
    pub host: String,
}

/// A batch whose every job resolved to a [`ScheduledJob`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledBatch {
    /// Scheduled jobs, in the original batch order.
    pub jobs: Vec<ScheduledJob>,
    /// Earliest job start in the batch.
    pub batch_start_ms: u128,
    /// Latest job end in the batch.
    pub batch_end_ms: u128,
}

/// Instruction handed to the dispatcher for one scheduled job.
///
/// Fire-and-forget from the scheduler's perspective: the dispatcher alone is
/// responsible for invoking the operation on the assigned host at the
/// assigned time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchInstruction {
    /// Operation kind to invoke.
    pub kind: OpKind,
    /// Target identifier.
    pub target: String,
    /// Thread count to run with.
    pub threads: u32,
    /// Host the reservation was granted on.
    pub host: String,
    /// Absolute start time, milliseconds since epoch.
    pub start_time_ms: u128,
    /// Job label, for the dispatcher's own logging.
    pub label: String,
    /// Argument payload for the remote operation.
    pub args: Vec<String>,
}

impl From<&ScheduledJob> for DispatchInstruction {
    fn from(scheduled: &ScheduledJob) -> Self {
        Self {
            kind: scheduled.job.kind,
            target: scheduled.job.target.clone(),
            threads: scheduled.job.threads,
            host: scheduled.host.clone(),
            start_time_ms: scheduled.job.start_time_ms,
            label: scheduled.job.label.clone(),
            args: scheduled.job.args.clone(),
        }
    }
}
