//! Batch pipelining.
//!
//! A cycle replicates one fully planned seed batch at a fixed cadence so
//! consecutive batches interleave in flight. Every replica keeps the seed's
//! intra-batch offsets exactly; only the absolute timestamps (and with them
//! the time-encoding labels) move.

use crate::core::job::Batch;

/// Replicate `seed` into a pipeline of up to `max_count` batches spaced
/// `cadence_ms` apart, the seed included as the first entry.
///
/// A `max_count` of zero yields an empty pipeline, and an empty seed yields
/// `max_count` empty batches only in the degenerate sense; callers plan a
/// non-empty seed before extending it.
#[must_use]
pub fn extend(seed: &Batch, max_count: usize, cadence_ms: u128) -> Vec<Batch> {
    let mut batches = Vec::with_capacity(max_count);
    for index in 0..max_count {
        let shift = cadence_ms * index as u128;
        batches.push(Batch::from_jobs(
            seed.jobs.iter().map(|job| job.shifted(shift)).collect(),
        ));
    }
    batches
}
