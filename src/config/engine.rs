//! Engine configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::EngineError;
use crate::core::job::OpKind;

/// Per-thread capacity cost for each operation kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCosts {
    /// Units consumed per deplete thread.
    pub deplete_unit_cost: f64,
    /// Units consumed per replenish thread.
    pub replenish_unit_cost: f64,
    /// Units consumed per suppress thread.
    pub suppress_unit_cost: f64,
}

impl OperationCosts {
    /// Unit cost for one thread of the given operation kind.
    #[must_use]
    pub const fn unit_cost(&self, kind: OpKind) -> f64 {
        match kind {
            OpKind::Deplete => self.deplete_unit_cost,
            OpKind::Replenish => self.replenish_unit_cost,
            OpKind::Suppress => self.suppress_unit_cost,
        }
    }
}

impl Default for OperationCosts {
    fn default() -> Self {
        Self {
            deplete_unit_cost: 1.7,
            replenish_unit_cost: 1.75,
            suppress_unit_cost: 1.75,
        }
    }
}

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cushion between consecutive stage deadlines, absorbing jitter.
    pub stage_buffer_ms: u128,
    /// Cadence between pipelined batches, also the lead time before a
    /// batch's first job may start.
    pub schedule_buffer_ms: u128,
    /// Maximum batches to pipeline per cycle (including the seed).
    pub max_batch_count: usize,
    /// Round-trip budget for one negotiation exchange.
    pub negotiation_timeout_ms: u64,
    /// Interval between re-evaluations of the most profitable target.
    pub retarget_interval_ms: u128,
    /// Maximum age for cached world snapshots.
    pub state_max_age_ms: u128,
    /// Per-thread capacity costs.
    pub costs: OperationCosts,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stage_buffer_ms: 250,
            schedule_buffer_ms: 1_000,
            max_batch_count: 25,
            negotiation_timeout_ms: 500,
            retarget_interval_ms: 600_000,
            state_max_age_ms: 10,
            costs: OperationCosts::default(),
        }
    }
}

impl EngineConfig {
    /// Negotiation timeout as a [`Duration`].
    #[must_use]
    pub const fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiation_timeout_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.stage_buffer_ms == 0 {
            return Err(EngineError::Config("stage_buffer_ms must be > 0".into()));
        }
        if self.schedule_buffer_ms == 0 {
            return Err(EngineError::Config("schedule_buffer_ms must be > 0".into()));
        }
        if self.max_batch_count == 0 {
            return Err(EngineError::Config("max_batch_count must be > 0".into()));
        }
        if self.negotiation_timeout_ms == 0 {
            return Err(EngineError::Config(
                "negotiation_timeout_ms must be > 0".into(),
            ));
        }
        if self.retarget_interval_ms == 0 {
            return Err(EngineError::Config(
                "retarget_interval_ms must be > 0".into(),
            ));
        }
        for kind in [OpKind::Deplete, OpKind::Replenish, OpKind::Suppress] {
            if self.costs.unit_cost(kind) <= 0.0 {
                return Err(EngineError::Config(format!(
                    "unit cost for {kind:?} must be > 0"
                )));
            }
        }
        Ok(())
    }

    /// Parse an engine configuration from a JSON string and validate it.
    ///
    /// # Errors
    /// Returns [`EngineError::Codec`] on parse failures and
    /// [`EngineError::Config`] on invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, EngineError> {
        let cfg: Self = serde_json::from_str(input)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
