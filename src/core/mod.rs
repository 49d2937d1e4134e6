//! Domain engine: jobs, timing, balancing, pipelining, and the cycle
//! state machine.

pub mod controller;
pub mod error;
pub mod job;
pub mod optimizer;
pub mod pipeline;
pub mod planner;
pub mod scheduler;

pub use controller::{CycleController, CyclePhase, CycleState};
pub use error::{AppResult, EngineError};
pub use job::{Batch, DispatchInstruction, Job, OpKind, ScheduledBatch, ScheduledJob};
pub use optimizer::{balance_threads, max_threads, EffectCurves, ThreadPlan};
pub use planner::{
    plan_extraction_batch, plan_replenish_batch, plan_suppress_batch, ExtractionThreads,
    StageDurations,
};
pub use scheduler::{ScheduleOutcome, SchedulingLoop};
