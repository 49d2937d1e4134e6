//! Batch timing planner.
//!
//! Timestamps are computed backward from an anchor: the final suppress
//! operation's end. Working backward with one stage buffer between
//! consecutive deadlines guarantees the required completion order: deplete
//! finishes first, each suppress stage lands right after the penalty source
//! it absorbs, and everything converges within one buffer window so the
//! target is corrected before the next cycle reads it.
//!
//! Preparation batches (suppress-only, replenish+suppress) follow the same
//! backward-anchoring rule using only the stages present.

use crate::config::EngineConfig;
use crate::core::job::{Batch, Job, OpKind};

/// Duration estimates for the three operation kinds against one target.
///
/// Suppress is assumed to be the longest of the kinds present in a cycle.
#[derive(Debug, Clone, Copy)]
pub struct StageDurations {
    /// Expected deplete duration, milliseconds.
    pub deplete_ms: u128,
    /// Expected replenish duration, milliseconds.
    pub replenish_ms: u128,
    /// Expected suppress duration, milliseconds.
    pub suppress_ms: u128,
}

/// Thread counts for the four steady-state stages.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionThreads {
    /// Deplete threads; zero omits the stage entirely.
    pub deplete: u32,
    /// Replenish threads.
    pub replenish: u32,
    /// First suppress stage, sized to absorb the deplete penalty.
    pub suppress_first: u32,
    /// Second suppress stage, sized to absorb the replenish penalty.
    pub suppress_second: u32,
}

/// Plan one steady-state batch of up to four stages.
///
/// Anchors the final suppress end at
/// `now + suppress + schedule_buffer + 4 * stage_buffer` and walks the
/// earlier deadlines backward one stage buffer apart; each stage starts its
/// own duration before its deadline. Stages with zero threads are omitted;
/// a zero-thread job is never emitted.
#[must_use]
pub fn plan_extraction_batch(
    now_ms: u128,
    target: &str,
    durations: &StageDurations,
    threads: &ExtractionThreads,
    config: &EngineConfig,
) -> Batch {
    let stage = config.stage_buffer_ms;
    let anchor = now_ms + durations.suppress_ms + config.schedule_buffer_ms + 4 * stage;
    let replenish_end = anchor - stage;
    let first_suppress_end = anchor - 2 * stage;
    let deplete_end = anchor - 3 * stage;

    let mut jobs = Vec::with_capacity(4);
    if threads.replenish > 0 {
        jobs.push(Job::new(
            OpKind::Replenish,
            "R",
            target,
            threads.replenish,
            config.costs.unit_cost(OpKind::Replenish),
            replenish_end - durations.replenish_ms,
            replenish_end,
        ));
    }
    if threads.deplete > 0 {
        jobs.push(Job::new(
            OpKind::Deplete,
            "D",
            target,
            threads.deplete,
            config.costs.unit_cost(OpKind::Deplete),
            deplete_end - durations.deplete_ms,
            deplete_end,
        ));
    }
    if threads.suppress_first > 0 {
        jobs.push(Job::new(
            OpKind::Suppress,
            "S1",
            target,
            threads.suppress_first,
            config.costs.unit_cost(OpKind::Suppress),
            first_suppress_end - durations.suppress_ms,
            first_suppress_end,
        ));
    }
    if threads.suppress_second > 0 {
        jobs.push(Job::new(
            OpKind::Suppress,
            "S2",
            target,
            threads.suppress_second,
            config.costs.unit_cost(OpKind::Suppress),
            anchor - durations.suppress_ms,
            anchor,
        ));
    }
    Batch::from_jobs(jobs)
}

/// Plan a suppress-only preparation batch.
#[must_use]
pub fn plan_suppress_batch(
    now_ms: u128,
    target: &str,
    suppress_ms: u128,
    suppress_threads: u32,
    config: &EngineConfig,
) -> Batch {
    let start = now_ms + config.schedule_buffer_ms;
    let end = start + suppress_ms + config.schedule_buffer_ms + config.stage_buffer_ms;
    let mut jobs = Vec::with_capacity(1);
    if suppress_threads > 0 {
        jobs.push(Job::new(
            OpKind::Suppress,
            "S",
            target,
            suppress_threads,
            config.costs.unit_cost(OpKind::Suppress),
            start,
            end,
        ));
    }
    Batch::from_jobs(jobs)
}

/// Plan a replenish+suppress preparation batch.
///
/// The replenish deadline sits one stage buffer before the suppress
/// deadline, so the penalty the replenish causes is absorbed before the next
/// state read.
#[must_use]
pub fn plan_replenish_batch(
    now_ms: u128,
    target: &str,
    durations: &StageDurations,
    replenish_threads: u32,
    suppress_threads: u32,
    config: &EngineConfig,
) -> Batch {
    let suppress_start = now_ms + config.schedule_buffer_ms;
    let suppress_end =
        suppress_start + durations.suppress_ms + config.schedule_buffer_ms + config.stage_buffer_ms;
    let replenish_end = suppress_end - config.stage_buffer_ms;

    let mut jobs = Vec::with_capacity(2);
    if replenish_threads > 0 {
        jobs.push(Job::new(
            OpKind::Replenish,
            "R",
            target,
            replenish_threads,
            config.costs.unit_cost(OpKind::Replenish),
            replenish_end - durations.replenish_ms,
            replenish_end,
        ));
    }
    if suppress_threads > 0 {
        jobs.push(Job::new(
            OpKind::Suppress,
            "S",
            target,
            suppress_threads,
            config.costs.unit_cost(OpKind::Suppress),
            suppress_start,
            suppress_end,
        ));
    }
    Batch::from_jobs(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn durations() -> StageDurations {
        StageDurations {
            deplete_ms: 2_500,
            replenish_ms: 8_000,
            suppress_ms: 10_000,
        }
    }

    #[test]
    fn steady_state_deadlines_sit_one_stage_buffer_apart() {
        let cfg = config();
        let threads = ExtractionThreads {
            deplete: 10,
            replenish: 20,
            suppress_first: 3,
            suppress_second: 5,
        };
        let batch = plan_extraction_batch(1_000_000, "alpha", &durations(), &threads, &cfg);
        assert_eq!(batch.jobs.len(), 4);

        let end_of = |tag: &str| {
            batch
                .jobs
                .iter()
                .find(|j| j.label.starts_with(tag))
                .unwrap()
                .end_time_ms
        };
        let anchor = 1_000_000 + 10_000 + cfg.schedule_buffer_ms + 4 * cfg.stage_buffer_ms;
        assert_eq!(end_of("S2 "), anchor);
        assert_eq!(end_of("R "), anchor - cfg.stage_buffer_ms);
        assert_eq!(end_of("S1 "), anchor - 2 * cfg.stage_buffer_ms);
        assert_eq!(end_of("D "), anchor - 3 * cfg.stage_buffer_ms);
        assert_eq!(batch.batch_end_ms, anchor);
    }

    #[test]
    fn each_stage_starts_its_duration_before_its_deadline() {
        let cfg = config();
        let threads = ExtractionThreads {
            deplete: 1,
            replenish: 1,
            suppress_first: 1,
            suppress_second: 1,
        };
        let batch = plan_extraction_batch(0, "alpha", &durations(), &threads, &cfg);
        for job in &batch.jobs {
            let expected = match job.kind {
                OpKind::Deplete => 2_500,
                OpKind::Replenish => 8_000,
                OpKind::Suppress => 10_000,
            };
            assert_eq!(job.end_time_ms - job.start_time_ms, expected);
        }
    }

    #[test]
    fn zero_deplete_threads_omit_the_stage() {
        let cfg = config();
        let threads = ExtractionThreads {
            deplete: 0,
            replenish: 4,
            suppress_first: 1,
            suppress_second: 1,
        };
        let batch = plan_extraction_batch(0, "alpha", &durations(), &threads, &cfg);
        assert_eq!(batch.jobs.len(), 3);
        assert!(batch.jobs.iter().all(|j| j.kind != OpKind::Deplete));
        assert!(batch.jobs.iter().all(|j| j.threads > 0));
    }

    #[test]
    fn replenish_prep_keeps_replenish_ahead_of_suppress() {
        let cfg = config();
        let batch = plan_replenish_batch(0, "alpha", &durations(), 12, 3, &cfg);
        assert_eq!(batch.jobs.len(), 2);
        let replenish = &batch.jobs[0];
        let suppress = &batch.jobs[1];
        assert_eq!(
            suppress.end_time_ms - replenish.end_time_ms,
            cfg.stage_buffer_ms
        );
        assert_eq!(batch.batch_end_ms, suppress.end_time_ms);
    }
}
