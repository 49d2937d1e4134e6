//! World-state provider boundary.
//!
//! The provider is read-only and side-effect free. Snapshot values may be
//! stale between successive same-key calls within a short window; callers
//! must treat every read as potentially cached and never assume freshness
//! (see [`crate::world::cache`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::EngineError;
use crate::core::job::OpKind;

/// Snapshot of one target's mutable and static properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    /// Target identifier.
    pub id: String,
    /// Current depletable value.
    pub depletable_amount: f64,
    /// Upper bound the depletable value can be replenished to.
    pub depletable_ceiling: f64,
    /// Current penalty level.
    pub penalty_level: f64,
    /// Lower bound the penalty can be suppressed to.
    pub penalty_floor: f64,
    /// Skill the actor needs before operations against this target work.
    pub required_skill: f64,
}

impl TargetState {
    /// Whether the target sits at its optimal bounds: value at ceiling and
    /// penalty at floor. Cycles read this before and after running.
    #[must_use]
    pub fn at_optimal_bounds(&self) -> bool {
        self.depletable_amount >= self.depletable_ceiling
            && self.penalty_level <= self.penalty_floor
    }
}

/// Snapshot of the acting entity's capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    /// Current skill level, compared against `TargetState::required_skill`.
    pub skill_level: f64,
    /// Multiplier applied to operation effects.
    pub effect_multiplier: f64,
    /// Multiplier applied to operation durations (lower is faster).
    pub speed_multiplier: f64,
}

/// Read-only provider of world snapshots and timing/effect formulas.
#[async_trait]
pub trait WorldState: Send + Sync {
    /// Fetch the current snapshot for a target.
    ///
    /// # Errors
    /// Returns [`EngineError::WorldState`] when the snapshot is unavailable.
    async fn target_state(&self, id: &str) -> Result<TargetState, EngineError>;

    /// Fetch the current actor snapshot.
    ///
    /// # Errors
    /// Returns [`EngineError::WorldState`] when the snapshot is unavailable.
    async fn actor_state(&self) -> Result<ActorState, EngineError>;

    /// Expected duration of one operation of `op` against `target`, in
    /// milliseconds. Suppress is assumed to be the longest of the kinds
    /// present in a cycle.
    fn estimate_duration(&self, op: OpKind, target: &TargetState, actor: &ActorState) -> u128;

    /// Fractional effect of running `op` with `threads` threads:
    /// for [`OpKind::Deplete`] the share of the depletable value extracted,
    /// for [`OpKind::Replenish`] the share of the ceiling recoverable, and
    /// for [`OpKind::Suppress`] the penalty reduction achieved.
    fn estimate_effect(
        &self,
        op: OpKind,
        threads: u32,
        target: &TargetState,
        actor: &ActorState,
    ) -> f64;

    /// Penalty added to the target by running `op` with `threads` threads.
    /// Meaningful for deplete and replenish; suppress adds none.
    fn penalty_delta(&self, op: OpKind, threads: u32) -> f64;

    /// Penalty removed per suppress thread.
    fn suppress_effect_per_thread(&self) -> f64 {
        0.05
    }
}
