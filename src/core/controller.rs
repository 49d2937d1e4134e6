//! Cycle controller: the per-target state machine driving the engine.
//!
//! One controller owns exactly one logical task. It prepares its target to
//! optimal bounds, then alternates planning/negotiating/dispatching steady
//! pipelines with sleeping until the pipeline drains. A periodic retarget
//! pass re-ranks candidate targets by estimated yield and restarts the
//! machine on a new winner. Drift detected at the top of a steady cycle
//! (value below ceiling or penalty above floor) raises a notification and
//! falls back to the preparation routine before extraction resumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::error::EngineError;
use crate::core::job::OpKind;
use crate::core::optimizer::{balance_threads, max_threads, EffectCurves, ThreadPlan};
use crate::core::pipeline;
use crate::core::planner::{
    plan_extraction_batch, plan_replenish_batch, plan_suppress_batch, ExtractionThreads,
    StageDurations,
};
use crate::core::scheduler::SchedulingLoop;
use crate::infra::channel::SharedChannel;
use crate::infra::dispatch::DispatcherClient;
use crate::infra::negotiation::CapacityClient;
use crate::util::clock::{now_ms, sleep_until_ms};
use crate::world::notify::NotificationSink;
use crate::world::state::{ActorState, TargetState, WorldState};

/// Phase of the per-target state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Driving the target to its optimal bounds before extraction.
    Preparing,
    /// Planning and dispatching steady extraction pipelines.
    SteadyCycle,
    /// Drift detected mid-steady; re-running preparation before resuming.
    Correcting,
}

/// Mutable controller state, reset whenever the target switches.
#[derive(Debug, Clone)]
pub struct CycleState {
    /// Target currently being worked.
    pub target: String,
    /// Estimated yield per second of the current target at last ranking.
    pub profit_per_sec: f64,
    /// When the candidate ranking last ran, milliseconds since epoch.
    pub last_retarget_ms: u128,
    /// Times drift forced a correction since the last target switch.
    pub drift_detections: u64,
}

/// Bridges the world's effect formulas into the optimizer's curve shape for
/// one (target, actor) snapshot pair.
struct WorldCurves<'a, W: WorldState + ?Sized> {
    world: &'a W,
    target: &'a TargetState,
    actor: &'a ActorState,
}

impl<W: WorldState + ?Sized> EffectCurves for WorldCurves<'_, W> {
    fn deplete_fraction(&self, threads: u32) -> f64 {
        self.world
            .estimate_effect(OpKind::Deplete, threads, self.target, self.actor)
    }

    fn replenish_fraction(&self, threads: u32) -> f64 {
        self.world
            .estimate_effect(OpKind::Replenish, threads, self.target, self.actor)
    }
}

/// Per-target cycle controller.
pub struct CycleController<W, N> {
    world: Arc<W>,
    sink: N,
    capacity: CapacityClient,
    scheduler: SchedulingLoop,
    config: EngineConfig,
    candidates: Vec<String>,
    state: CycleState,
    phase: CyclePhase,
}

impl<W: WorldState, N: NotificationSink> CycleController<W, N> {
    /// Create a controller speaking on the allocator and dispatcher channels
    /// under a freshly minted per-instance source identity.
    ///
    /// The first candidate seeds the initial target; the first `run_once`
    /// re-ranks immediately.
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] when `candidates` is empty or the
    /// configuration fails validation.
    pub fn new(
        world: Arc<W>,
        sink: N,
        allocator_channel: SharedChannel,
        dispatcher_channel: SharedChannel,
        candidates: Vec<String>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let Some(initial) = candidates.first().cloned() else {
            return Err(EngineError::Config(
                "at least one candidate target is required".into(),
            ));
        };
        let source = format!("scheduler-{}", uuid::Uuid::new_v4());
        let timeout = config.negotiation_timeout();
        let capacity = CapacityClient::new(allocator_channel.clone(), source.clone(), timeout);
        let scheduler = SchedulingLoop::new(
            CapacityClient::new(allocator_channel, source.clone(), timeout),
            DispatcherClient::new(dispatcher_channel, source, timeout),
            config.schedule_buffer_ms,
        );
        Ok(Self {
            world,
            sink,
            capacity,
            scheduler,
            config,
            candidates,
            state: CycleState {
                target: initial,
                profit_per_sec: 0.0,
                last_retarget_ms: 0,
                drift_detections: 0,
            },
            phase: CyclePhase::Preparing,
        })
    }

    /// Current machine phase.
    #[must_use]
    pub const fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Current controller state.
    #[must_use]
    pub const fn state(&self) -> &CycleState {
        &self.state
    }

    /// Run cycles until `stop` is raised; checked between cycles only, so a
    /// cycle in flight always completes.
    ///
    /// # Errors
    /// Propagates transport and world-state failures from [`Self::run_once`].
    pub async fn run(&mut self, stop: Arc<AtomicBool>) -> Result<(), EngineError> {
        while !stop.load(Ordering::Relaxed) {
            self.run_once().await?;
        }
        tracing::info!("stop requested, controller for {} exiting", self.state.target);
        Ok(())
    }

    /// Perform exactly one full cycle: service the retarget timer, run the
    /// preparation routine if the phase calls for it, then one steady pass.
    /// A one-shot invocation therefore always reaches extraction once the
    /// target is at bounds.
    ///
    /// # Errors
    /// Returns transport failures from negotiation/dispatch and
    /// [`EngineError::WorldState`] from snapshot reads.
    pub async fn run_once(&mut self) -> Result<(), EngineError> {
        self.maybe_retarget().await?;
        if matches!(self.phase, CyclePhase::Preparing | CyclePhase::Correcting) {
            self.prepare().await?;
            self.phase = CyclePhase::SteadyCycle;
        }
        self.steady_cycle().await
    }

    /// Re-rank candidates when the retarget interval has elapsed.
    async fn maybe_retarget(&mut self) -> Result<(), EngineError> {
        let now = now_ms();
        if now < self.state.last_retarget_ms + self.config.retarget_interval_ms {
            return Ok(());
        }
        self.state.last_retarget_ms = now;

        let Some(grant) = self.capacity.query_max_grantable().await? else {
            tracing::warn!("allocator capacity query timed out, keeping current target");
            return Ok(());
        };
        let actor = self.world.actor_state().await?;

        let mut best: Option<(String, f64)> = None;
        for candidate in &self.candidates {
            let snapshot = self.world.target_state(candidate).await?;
            if snapshot.required_skill > actor.skill_level {
                continue;
            }
            // Rank at optimal bounds: what the target yields once prepared.
            let optimal = TargetState {
                depletable_amount: snapshot.depletable_ceiling,
                penalty_level: snapshot.penalty_floor,
                ..snapshot
            };
            let suppress_ms = self
                .world
                .estimate_duration(OpKind::Suppress, &optimal, &actor);
            if suppress_ms == 0 {
                continue;
            }
            let curves = WorldCurves {
                world: self.world.as_ref(),
                target: &optimal,
                actor: &actor,
            };
            let plan = balance_threads(
                grant,
                self.config.costs.deplete_unit_cost,
                self.config.costs.replenish_unit_cost,
                &curves,
            );
            let yield_per_sec = curves.deplete_fraction(plan.deplete_threads)
                * optimal.depletable_ceiling
                / (suppress_ms as f64 / 1_000.0);
            tracing::debug!("candidate {candidate}: {yield_per_sec:.2}/s");
            if best.as_ref().map_or(true, |(_, y)| yield_per_sec > *y) {
                best = Some((candidate.clone(), yield_per_sec));
            }
        }

        let Some((winner, profit)) = best else {
            tracing::warn!("no workable candidate target, keeping {}", self.state.target);
            return Ok(());
        };
        if winner == self.state.target {
            self.state.profit_per_sec = profit;
            return Ok(());
        }
        tracing::info!(
            "retarget: {} -> {winner} ({profit:.2}/s)",
            self.state.target
        );
        self.state = CycleState {
            target: winner,
            profit_per_sec: profit,
            last_retarget_ms: now,
            drift_detections: 0,
        };
        self.phase = CyclePhase::Preparing;
        Ok(())
    }

    /// Drive the target to optimal bounds: suppress the penalty to its
    /// floor, then replenish the value to its ceiling (covering the penalty
    /// each replenish adds), one batch per pass.
    async fn prepare(&mut self) -> Result<(), EngineError> {
        loop {
            let target = self.world.target_state(&self.state.target).await?;
            let actor = self.world.actor_state().await?;
            self.log_status(&target);
            if target.at_optimal_bounds() {
                tracing::info!("{} prepared, entering steady cycles", target.id);
                return Ok(());
            }
            let Some(grant) = self.capacity.query_max_grantable().await? else {
                tracing::warn!("allocator capacity query timed out, retrying preparation");
                sleep_until_ms(now_ms() + self.config.schedule_buffer_ms).await;
                continue;
            };
            let durations = self.stage_durations(&target, &actor);
            let suppress_cap = max_threads(grant, self.config.costs.suppress_unit_cost);

            let batch = if target.penalty_level > target.penalty_floor {
                let needed = ceil_threads(
                    (target.penalty_level - target.penalty_floor)
                        / self.world.suppress_effect_per_thread(),
                );
                plan_suppress_batch(
                    now_ms(),
                    &target.id,
                    durations.suppress_ms,
                    needed.min(suppress_cap),
                    &self.config,
                )
            } else {
                let deficit = 1.0 - target.depletable_amount / target.depletable_ceiling;
                let curves = WorldCurves {
                    world: self.world.as_ref(),
                    target: &target,
                    actor: &actor,
                };
                let replenish_cap =
                    max_threads(grant, self.config.costs.replenish_unit_cost).max(1);
                let replenish = minimal_covering_threads(replenish_cap, deficit, |t| {
                    curves.replenish_fraction(t)
                });
                let suppress = ceil_threads(
                    self.world.penalty_delta(OpKind::Replenish, replenish)
                        / self.world.suppress_effect_per_thread(),
                )
                .min(suppress_cap);
                plan_replenish_batch(
                    now_ms(),
                    &target.id,
                    &durations,
                    replenish,
                    suppress,
                    &self.config,
                )
            };

            if batch.jobs.is_empty() {
                tracing::warn!("no capacity for preparation batch against {}", target.id);
                sleep_until_ms(now_ms() + self.config.schedule_buffer_ms).await;
                continue;
            }
            let outcome = self.scheduler.schedule(std::slice::from_ref(&batch)).await?;
            sleep_until_ms(outcome.next_wake_ms).await;
        }
    }

    /// One steady pass: refresh state, detect drift, plan and pipeline a
    /// balanced extraction batch, schedule it, and sleep out the pipeline.
    async fn steady_cycle(&mut self) -> Result<(), EngineError> {
        let target = self.world.target_state(&self.state.target).await?;
        let actor = self.world.actor_state().await?;
        self.log_status(&target);

        if !target.at_optimal_bounds() {
            self.state.drift_detections += 1;
            self.sink.warn(
                "target drift detected",
                &format!(
                    "{}: value {:.0}/{:.0}, penalty {:.2} (floor {:.2})",
                    target.id,
                    target.depletable_amount,
                    target.depletable_ceiling,
                    target.penalty_level,
                    target.penalty_floor
                ),
            );
            self.phase = CyclePhase::Correcting;
            return Ok(());
        }

        let Some(grant) = self.capacity.query_max_grantable().await? else {
            tracing::warn!("allocator capacity query timed out, skipping cycle");
            sleep_until_ms(now_ms() + self.config.schedule_buffer_ms).await;
            return Ok(());
        };
        let curves = WorldCurves {
            world: self.world.as_ref(),
            target: &target,
            actor: &actor,
        };
        let plan = balance_threads(
            grant,
            self.config.costs.deplete_unit_cost,
            self.config.costs.replenish_unit_cost,
            &curves,
        );
        if plan.replenish_threads == 0 {
            tracing::warn!("no capacity for a steady batch against {}", target.id);
            sleep_until_ms(now_ms() + self.config.schedule_buffer_ms).await;
            return Ok(());
        }
        let threads = self.extraction_threads(&plan);
        let durations = self.stage_durations(&target, &actor);
        let seed = plan_extraction_batch(now_ms(), &target.id, &durations, &threads, &self.config);
        let cadence = self.config.schedule_buffer_ms;
        let batches = pipeline::extend(&seed, self.config.max_batch_count, cadence);

        let outcome = self.scheduler.schedule(&batches).await?;
        if let Some(index) = outcome.aborted_from {
            tracing::info!(
                "pipeline truncated at batch {} of {}",
                index + 1,
                batches.len()
            );
        }
        sleep_until_ms(outcome.next_wake_ms).await;
        Ok(())
    }

    /// Size the four steady stages: the optimizer's deplete/replenish pair
    /// plus one suppress stage per penalty source, each padded by one thread
    /// to absorb estimation error.
    fn extraction_threads(&self, plan: &ThreadPlan) -> ExtractionThreads {
        let per_thread = self.world.suppress_effect_per_thread();
        let first = ceil_threads(
            self.world.penalty_delta(OpKind::Deplete, plan.deplete_threads) / per_thread,
        ) + 1;
        let second = ceil_threads(
            self.world
                .penalty_delta(OpKind::Replenish, plan.replenish_threads)
                / per_thread,
        ) + 1;
        ExtractionThreads {
            deplete: plan.deplete_threads,
            replenish: plan.replenish_threads,
            suppress_first: first,
            suppress_second: second,
        }
    }

    fn stage_durations(&self, target: &TargetState, actor: &ActorState) -> StageDurations {
        StageDurations {
            deplete_ms: self.world.estimate_duration(OpKind::Deplete, target, actor),
            replenish_ms: self
                .world
                .estimate_duration(OpKind::Replenish, target, actor),
            suppress_ms: self
                .world
                .estimate_duration(OpKind::Suppress, target, actor),
        }
    }

    fn log_status(&self, target: &TargetState) {
        tracing::info!(
            "{}: value {:.1}% of ceiling, penalty +{:.2} over floor [{:?}]",
            target.id,
            100.0 * target.depletable_amount / target.depletable_ceiling,
            target.penalty_level - target.penalty_floor,
            self.phase
        );
    }
}

/// Ceiling of a non-negative fractional thread requirement.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ceil_threads(value: f64) -> u32 {
    if value <= 0.0 {
        return 0;
    }
    let ceiled = value.ceil();
    if ceiled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        ceiled as u32
    }
}

/// Smallest thread count in `1..=cap` whose effect covers `needed`, or `cap`
/// when even the cap falls short.
fn minimal_covering_threads(cap: u32, needed: f64, effect: impl Fn(u32) -> f64) -> u32 {
    let mut threads = cap;
    while threads > 1 && effect(threads - 1) >= needed {
        threads -= 1;
    }
    threads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_threads_rounds_up_and_clamps() {
        assert_eq!(ceil_threads(-1.0), 0);
        assert_eq!(ceil_threads(0.0), 0);
        assert_eq!(ceil_threads(0.01), 1);
        assert_eq!(ceil_threads(3.0), 3);
        assert_eq!(ceil_threads(3.2), 4);
        assert_eq!(ceil_threads(f64::from(u32::MAX) * 4.0), u32::MAX);
    }

    #[test]
    fn minimal_covering_threads_walks_down_to_the_edge() {
        // effect = 0.1 per thread, need 0.35 -> 4 threads.
        assert_eq!(
            minimal_covering_threads(10, 0.35, |t| f64::from(t) * 0.1),
            4
        );
        // cap insufficient -> cap.
        assert_eq!(minimal_covering_threads(3, 0.35, |t| f64::from(t) * 0.1), 3);
    }
}
