//! Optimizer safety: thread counts stay within the capacity ceiling and
//! replenishment always covers depletion, across randomized inputs.

use extraction_scheduler::core::{balance_threads, max_threads, EffectCurves};
use rand::Rng;

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

/// Deplete effect that stops improving past a saturation point.
struct SaturatingCurves {
    saturation: u32,
    deplete_per_thread: f64,
    replenish_per_thread: f64,
}

impl EffectCurves for SaturatingCurves {
    fn deplete_fraction(&self, threads: u32) -> f64 {
        f64::from(threads.min(self.saturation)) * self.deplete_per_thread
    }

    fn replenish_fraction(&self, threads: u32) -> f64 {
        f64::from(threads) * self.replenish_per_thread
    }
}

#[test]
fn saturated_deplete_does_not_inflate_replenish() {
    // Ceiling 100 at unit costs 2 and 4: at most 50 deplete and 25 replenish
    // threads. Deplete saturates at 50 threads (0.2 extracted); replenish
    // recovers 0.01/thread, so ~21 threads suffice and 25 must not be used.
    let curves = SaturatingCurves {
        saturation: 50,
        deplete_per_thread: 0.004,
        replenish_per_thread: 0.01,
    };
    let plan = balance_threads(100.0, 2.0, 4.0, &curves);

    assert_eq!(plan.deplete_threads, 50);
    assert!(plan.replenish_threads < 25);
    assert!(
        curves.replenish_fraction(plan.replenish_threads)
            >= curves.deplete_fraction(plan.deplete_threads)
    );
}

#[test]
fn randomized_inputs_never_violate_safety() {
    let mut rng = rand::rng();
    for _ in 0..1_000 {
        let ceiling = rng.random_range(0.0..400.0);
        let deplete_cost = rng.random_range(0.5..5.0);
        let replenish_cost = rng.random_range(0.5..5.0);
        let curves = LinearCurves {
            deplete_per_thread: rng.random_range(0.0001..0.05),
            replenish_per_thread: rng.random_range(0.0001..0.05),
        };
        let plan = balance_threads(ceiling, deplete_cost, replenish_cost, &curves);

        assert!(plan.deplete_threads <= max_threads(ceiling, deplete_cost));
        assert!(plan.replenish_threads <= max_threads(ceiling, replenish_cost));
        assert!(
            curves.replenish_fraction(plan.replenish_threads) + 1e-9
                >= curves.deplete_fraction(plan.deplete_threads),
            "replenish {} must cover deplete {} (ceiling {ceiling})",
            plan.replenish_threads,
            plan.deplete_threads,
        );
    }
}

#[test]
fn zero_ceiling_is_a_valid_degenerate_input() {
    let curves = LinearCurves {
        deplete_per_thread: 0.01,
        replenish_per_thread: 0.01,
    };
    let plan = balance_threads(0.0, 1.7, 1.75, &curves);
    assert_eq!(plan.deplete_threads, 0);
    assert_eq!(plan.replenish_threads, 0);
}
