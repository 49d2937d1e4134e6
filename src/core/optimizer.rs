//! Thread-count balancing between the deplete and replenish operations.
//!
//! Both operations compete for the same capacity ceiling, and a cycle is only
//! safe when the replenish stage's fractional recovery is at least the
//! deplete stage's fractional extraction; otherwise one cycle could drive
//! the target net-negative. The search pins whichever side is the binding
//! constraint at its maximum and walks the other side down one thread at a
//! time, which is linear in thread count and terminates in both branches.

/// Monotone fractional effect curves for the two competing operations.
pub trait EffectCurves {
    /// Share of the depletable value extracted by `threads` deplete threads.
    fn deplete_fraction(&self, threads: u32) -> f64;
    /// Share of the ceiling recoverable by `threads` replenish threads.
    fn replenish_fraction(&self, threads: u32) -> f64;
}

/// Balanced thread allocation for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadPlan {
    /// Deplete threads; zero means the deplete stage is skipped.
    pub deplete_threads: u32,
    /// Replenish threads.
    pub replenish_threads: u32,
}

/// Largest whole thread count affordable under the ceiling.
#[must_use]
pub fn max_threads(ceiling: f64, unit_cost: f64) -> u32 {
    if ceiling <= 0.0 || unit_cost <= 0.0 {
        return 0;
    }
    let threads = (ceiling / unit_cost).floor();
    if threads >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        threads as u32
    }
}

/// Find the largest `(deplete, replenish)` thread counts under `ceiling`
/// such that replenishment fully offsets depletion.
///
/// When replenish-at-max over-covers deplete-at-max, deplete is the binding
/// constraint: it stays at its maximum while replenish is walked down to the
/// minimal sufficient overshoot (one step back up after undershooting).
/// Otherwise replenish stays at its maximum and deplete is walked down until
/// covered, flooring at zero; a zero deplete count is valid and simply
/// skips the stage.
pub fn balance_threads(
    ceiling: f64,
    deplete_unit_cost: f64,
    replenish_unit_cost: f64,
    curves: &impl EffectCurves,
) -> ThreadPlan {
    let deplete_max = max_threads(ceiling, deplete_unit_cost);
    let replenish_max = max_threads(ceiling, replenish_unit_cost);
    let deplete_at_max = curves.deplete_fraction(deplete_max);
    let replenish_at_max = curves.replenish_fraction(replenish_max);

    if replenish_at_max > deplete_at_max {
        // Deplete is the binding constraint; trim replenish to just over it.
        let mut replenish = replenish_max;
        while replenish > 0 && curves.replenish_fraction(replenish) > deplete_at_max {
            replenish -= 1;
        }
        replenish = (replenish + 1).min(replenish_max);
        tracing::debug!(
            "balanced threads: deplete {} (binding), replenish {}",
            deplete_max,
            replenish
        );
        ThreadPlan {
            deplete_threads: deplete_max,
            replenish_threads: replenish,
        }
    } else {
        // Replenish is the binding constraint; trim deplete until covered.
        let mut deplete = deplete_max;
        while deplete > 0 && curves.deplete_fraction(deplete) > replenish_at_max {
            deplete -= 1;
        }
        tracing::debug!(
            "balanced threads: deplete {}, replenish {} (binding)",
            deplete,
            replenish_max
        );
        ThreadPlan {
            deplete_threads: deplete,
            replenish_threads: replenish_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LinearCurves {
        deplete_per_thread: f64,
        replenish_per_thread: f64,
    }

    impl EffectCurves for LinearCurves {
        fn deplete_fraction(&self, threads: u32) -> f64 {
            f64::from(threads) * self.deplete_per_thread
        }

        fn replenish_fraction(&self, threads: u32) -> f64 {
            f64::from(threads) * self.replenish_per_thread
        }
    }

    #[test]
    fn zero_ceiling_yields_zero_threads() {
        let curves = LinearCurves {
            deplete_per_thread: 0.01,
            replenish_per_thread: 0.01,
        };
        let plan = balance_threads(0.0, 1.7, 1.75, &curves);
        assert_eq!(plan.deplete_threads, 0);
        assert_eq!(plan.replenish_threads, 0);
    }

    #[test]
    fn replenish_trims_to_minimal_sufficient_overshoot() {
        // Replenish recovers much faster than deplete extracts, so deplete
        // binds and replenish walks down to just above coverage.
        let curves = LinearCurves {
            deplete_per_thread: 0.002,
            replenish_per_thread: 0.02,
        };
        let plan = balance_threads(100.0, 2.0, 4.0, &curves);
        assert_eq!(plan.deplete_threads, 50);
        // need = 0.1; 5 threads recover exactly 0.1, 6 overshoot.
        assert_eq!(plan.replenish_threads, 6);
        assert!(
            curves.replenish_fraction(plan.replenish_threads)
                >= curves.deplete_fraction(plan.deplete_threads)
        );
    }

    #[test]
    fn deplete_walks_down_when_replenish_binds() {
        let curves = LinearCurves {
            deplete_per_thread: 0.05,
            replenish_per_thread: 0.001,
        };
        let plan = balance_threads(100.0, 2.0, 4.0, &curves);
        assert_eq!(plan.replenish_threads, 25);
        // replenish at max = 0.025; largest deplete with 0.05/thread <= 0.025 is 0.
        assert_eq!(plan.deplete_threads, 0);
    }
}
