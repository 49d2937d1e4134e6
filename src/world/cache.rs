//! Read-through snapshot cache for world-state providers.
//!
//! Remote snapshot fetches are the expensive calls in a cycle, and the same
//! key is often read several times within a few milliseconds. `CachedWorld`
//! wraps any provider and serves repeat reads from a bounded-age cache; the
//! timing/effect formulas are pure and pass straight through.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::core::error::EngineError;
use crate::core::job::OpKind;
use crate::util::clock::now_ms;
use crate::world::state::{ActorState, TargetState, WorldState};

/// Read-through cache with a configurable maximum snapshot age.
pub struct CachedWorld<W> {
    inner: W,
    max_age_ms: u128,
    targets: Mutex<HashMap<String, (u128, TargetState)>>,
    actor: Mutex<Option<(u128, ActorState)>>,
}

impl<W> CachedWorld<W> {
    /// Wrap a provider; snapshots older than `max_age_ms` are refetched.
    pub fn new(inner: W, max_age_ms: u128) -> Self {
        Self {
            inner,
            max_age_ms,
            targets: Mutex::new(HashMap::new()),
            actor: Mutex::new(None),
        }
    }

    /// Wrap a provider using the engine configuration's snapshot age bound.
    pub fn from_config(inner: W, config: &EngineConfig) -> Self {
        Self::new(inner, config.state_max_age_ms)
    }

    /// Drop all cached snapshots.
    pub fn invalidate(&self) {
        self.targets.lock().clear();
        *self.actor.lock() = None;
    }

    fn fresh(&self, fetched_at_ms: u128) -> bool {
        now_ms().saturating_sub(fetched_at_ms) <= self.max_age_ms
    }
}

#[async_trait]
impl<W: WorldState> WorldState for CachedWorld<W> {
    async fn target_state(&self, id: &str) -> Result<TargetState, EngineError> {
        if let Some((fetched_at, state)) = self.targets.lock().get(id) {
            if self.fresh(*fetched_at) {
                return Ok(state.clone());
            }
        }
        let state = self.inner.target_state(id).await?;
        self.targets
            .lock()
            .insert(id.to_string(), (now_ms(), state.clone()));
        Ok(state)
    }

    async fn actor_state(&self) -> Result<ActorState, EngineError> {
        if let Some((fetched_at, state)) = self.actor.lock().as_ref() {
            if self.fresh(*fetched_at) {
                return Ok(state.clone());
            }
        }
        let state = self.inner.actor_state().await?;
        *self.actor.lock() = Some((now_ms(), state.clone()));
        Ok(state)
    }

    fn estimate_duration(&self, op: OpKind, target: &TargetState, actor: &ActorState) -> u128 {
        self.inner.estimate_duration(op, target, actor)
    }

    fn estimate_effect(
        &self,
        op: OpKind,
        threads: u32,
        target: &TargetState,
        actor: &ActorState,
    ) -> f64 {
        self.inner.estimate_effect(op, threads, target, actor)
    }

    fn penalty_delta(&self, op: OpKind, threads: u32) -> f64 {
        self.inner.penalty_delta(op, threads)
    }

    fn suppress_effect_per_thread(&self) -> f64 {
        self.inner.suppress_effect_per_thread()
    }
}
