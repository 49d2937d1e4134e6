//! Capacity negotiation loop over a planned pipeline.
//!
//! Each job is negotiated individually, in batch order. A batch only
//! dispatches once every one of its jobs holds a reservation; the first
//! denial abandons the current batch *and every later batch* in the
//! pipeline, since later batches would draw on the same saturated pool.

use crate::core::error::EngineError;
use crate::core::job::{Batch, ScheduledBatch, ScheduledJob};
use crate::infra::dispatch::DispatcherClient;
use crate::infra::negotiation::CapacityClient;
use crate::util::clock::now_ms;

/// Result of pushing one pipeline through negotiation and dispatch.
#[derive(Debug)]
pub struct ScheduleOutcome {
    /// Fully reserved and dispatched batches, in pipeline order.
    pub batches: Vec<ScheduledBatch>,
    /// Index of the first abandoned batch, when a denial truncated the run.
    pub aborted_from: Option<usize>,
    /// When the caller should wake again: one schedule buffer past the last
    /// dispatched batch's end, or one buffer from now if nothing landed.
    pub next_wake_ms: u128,
}

/// Drives a planned pipeline through reservation and dispatch.
pub struct SchedulingLoop {
    capacity: CapacityClient,
    dispatcher: DispatcherClient,
    schedule_buffer_ms: u128,
}

impl SchedulingLoop {
    /// Create a loop negotiating with `capacity` and handing reserved jobs
    /// to `dispatcher`.
    #[must_use]
    pub const fn new(
        capacity: CapacityClient,
        dispatcher: DispatcherClient,
        schedule_buffer_ms: u128,
    ) -> Self {
        Self {
            capacity,
            dispatcher,
            schedule_buffer_ms,
        }
    }

    /// Negotiate and dispatch `pipeline` until exhausted or denied.
    ///
    /// Jobs within a batch reserve in order; the batch dispatches only after
    /// all of its reservations succeed, so a partially reserved batch never
    /// reaches the dispatcher (its grants lapse unused). The first denial,
    /// explicit or by negotiation timeout, abandons everything from the
    /// current batch onward.
    ///
    /// A fully reserved batch dispatches before the next batch negotiates.
    /// Dispatched instructions are never retracted, so this is equivalent to
    /// dispatching after the whole pipeline resolves; it just bounds how long
    /// granted reservations sit idle before the dispatcher learns of them.
    ///
    /// # Errors
    /// Only transport failures (channel jammed past its timeout, codec
    /// errors) surface as errors; denials are a normal outcome.
    pub async fn schedule(&self, pipeline: &[Batch]) -> Result<ScheduleOutcome, EngineError> {
        let mut batches: Vec<ScheduledBatch> = Vec::with_capacity(pipeline.len());
        let mut aborted_from = None;

        'pipeline: for (index, batch) in pipeline.iter().enumerate() {
            let mut granted = Vec::with_capacity(batch.jobs.len());
            for job in &batch.jobs {
                let response = self
                    .capacity
                    .request_capacity(job.ram, job.start_time_ms, job.end_time_ms)
                    .await?;
                match response.host {
                    Some(host) if response.success => {
                        granted.push(ScheduledJob {
                            job: job.clone(),
                            host,
                        });
                    }
                    _ => {
                        tracing::warn!(
                            "reservation denied for {} (batch {} of {}), abandoning remainder",
                            job.label,
                            index + 1,
                            pipeline.len()
                        );
                        aborted_from = Some(index);
                        break 'pipeline;
                    }
                }
            }
            for scheduled in &granted {
                self.dispatcher.dispatch(scheduled).await?;
            }
            batches.push(ScheduledBatch {
                jobs: granted,
                batch_start_ms: batch.batch_start_ms,
                batch_end_ms: batch.batch_end_ms,
            });
        }

        let next_wake_ms = batches.last().map_or_else(
            || now_ms() + self.schedule_buffer_ms,
            |last| last.batch_end_ms + self.schedule_buffer_ms,
        );
        tracing::info!(
            "scheduled {} of {} batches, next wake at {}",
            batches.len(),
            pipeline.len(),
            next_wake_ms
        );
        Ok(ScheduleOutcome {
            batches,
            aborted_from,
            next_wake_ms,
        })
    }
}
