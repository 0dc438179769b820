//! Distribution sampler tests.

use cyberrisk_core::{
    rng::SimRng,
    sampler::{sample_bernoulli, sample_poisson, sample_triangular},
};
use proptest::prelude::*;

#[test]
fn triangular_draws_stay_within_bounds() {
    let mut rng = SimRng::from_seed(1);
    for _ in 0..1_000 {
        let v = sample_triangular(&mut rng, 10.0, 50.0, 100.0);
        assert!((10.0..=100.0).contains(&v), "draw {v} outside [10, 100]");
    }
}

/// Sample mean of Tri(a, c, b) converges on (a + b + c) / 3.
#[test]
fn triangular_mean_matches_closed_form() {
    let mut rng = SimRng::from_seed(2024);
    let n = 50_000;
    let sum: f64 = (0..n)
        .map(|_| sample_triangular(&mut rng, 10.0, 50.0, 100.0))
        .sum();
    let mean = sum / n as f64;
    let expected = (10.0 + 50.0 + 100.0) / 3.0;
    assert!(
        (mean - expected).abs() < 1.0,
        "sample mean {mean:.2} far from {expected:.2}"
    );
}

#[test]
fn degenerate_triangular_returns_min() {
    let mut rng = SimRng::from_seed(3);
    assert_eq!(sample_triangular(&mut rng, 7.5, 7.5, 7.5), 7.5);
}

#[test]
fn mode_at_either_edge_is_accepted() {
    let mut rng = SimRng::from_seed(4);
    for _ in 0..1_000 {
        let left = sample_triangular(&mut rng, 0.0, 0.0, 1.0);
        let right = sample_triangular(&mut rng, 0.0, 1.0, 1.0);
        assert!((0.0..=1.0).contains(&left));
        assert!((0.0..=1.0).contains(&right));
    }
}

#[test]
fn poisson_with_zero_rate_never_fires() {
    let mut rng = SimRng::from_seed(5);
    for _ in 0..100 {
        assert_eq!(sample_poisson(&mut rng, 0.0), 0);
    }
}

#[test]
fn poisson_mean_tracks_lambda() {
    let mut rng = SimRng::from_seed(6);
    let n = 20_000;
    let total: u64 = (0..n).map(|_| sample_poisson(&mut rng, 2.5)).sum();
    let mean = total as f64 / n as f64;
    assert!((mean - 2.5).abs() < 0.1, "Poisson mean {mean:.3} far from 2.5");
}

#[test]
fn bernoulli_extremes_are_certain() {
    let mut rng = SimRng::from_seed(7);
    for _ in 0..1_000 {
        assert_eq!(sample_bernoulli(&mut rng, 0.0), 0);
        assert_eq!(sample_bernoulli(&mut rng, 1.0), 1);
    }
}

proptest! {
    #[test]
    fn prop_triangular_within_bounds(
        seed in any::<u64>(),
        min in -1_000.0f64..1_000.0,
        left in 0.0f64..500.0,
        right in 0.0f64..500.0,
    ) {
        let mode = min + left;
        let max = mode + right;
        let mut rng = SimRng::from_seed(seed);
        for _ in 0..32 {
            let v = sample_triangular(&mut rng, min, mode, max);
            prop_assert!(v >= min - 1e-9 && v <= max + 1e-9, "{v} outside [{min}, {max}]");
        }
    }

    #[test]
    fn prop_bernoulli_is_binary(seed in any::<u64>(), p in 0.0f64..=1.0) {
        let mut rng = SimRng::from_seed(seed);
        for _ in 0..32 {
            let b = sample_bernoulli(&mut rng, p);
            prop_assert!(b == 0 || b == 1);
        }
    }

    #[test]
    fn prop_poisson_non_positive_rate_is_zero(seed in any::<u64>(), lambda in -100.0f64..=0.0) {
        let mut rng = SimRng::from_seed(seed);
        prop_assert_eq!(sample_poisson(&mut rng, lambda), 0);
    }
}
