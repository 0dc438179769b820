//! Insurance layer tests.

use cyberrisk_core::{
    insurance::{net_loss, InsurancePolicy, DEFAULT_COVERAGE_LIMIT, DEFAULT_DEDUCTIBLE},
    EngineError,
};
use proptest::prelude::*;

#[test]
fn loss_below_deductible_is_fully_retained() {
    assert_eq!(net_loss(100.0, 200.0, 1_000.0), 100.0);
}

#[test]
fn loss_inside_layer_retains_only_deductible() {
    assert_eq!(net_loss(500.0, 100.0, 1_000.0), 100.0);
}

#[test]
fn loss_above_limit_retains_the_excess() {
    // 2000 - min(1900, 1000) = 1000
    assert_eq!(net_loss(2_000.0, 100.0, 1_000.0), 1_000.0);
}

#[test]
fn zero_loss_stays_zero() {
    assert_eq!(net_loss(0.0, 250_000.0, 10_000_000.0), 0.0);
}

#[test]
fn default_policy_uses_fallback_terms() {
    let policy = InsurancePolicy::default();
    assert_eq!(policy.deductible, DEFAULT_DEDUCTIBLE);
    assert_eq!(policy.coverage_limit, DEFAULT_COVERAGE_LIMIT);
    assert_eq!(policy.net_loss(1_000_000.0), 250_000.0);
}

#[test]
fn policy_deserializes_from_camel_case() {
    let policy: InsurancePolicy =
        serde_json::from_str(r#"{"deductible": 500000, "coverageLimit": 5000000}"#).unwrap();
    assert_eq!(policy.deductible, 500_000.0);
    assert_eq!(policy.coverage_limit, 5_000_000.0);
}

#[test]
fn negative_or_non_finite_terms_are_rejected() {
    for (deductible, coverage_limit) in [
        (0.0, -1_000_000.0),
        (-1.0, 1_000.0),
        (f64::NAN, 1_000.0),
        (0.0, f64::INFINITY),
    ] {
        let policy = InsurancePolicy { deductible, coverage_limit };
        assert!(
            matches!(policy.validate(), Err(EngineError::InvalidPolicy { .. })),
            "accepted deductible={deductible}, limit={coverage_limit}"
        );
    }
    InsurancePolicy::default().validate().unwrap();
    InsurancePolicy { deductible: 0.0, coverage_limit: 0.0 }.validate().unwrap();
}

proptest! {
    #[test]
    fn prop_net_never_exceeds_gross(
        gross in 0.0f64..1e9,
        deductible in 0.0f64..1e7,
        limit in 0.0f64..1e8,
    ) {
        let net = net_loss(gross, deductible, limit);
        prop_assert!(net <= gross);
        prop_assert!(net >= 0.0);
    }

    #[test]
    fn prop_net_is_non_decreasing_in_gross(
        a in 0.0f64..1e8,
        b in 0.0f64..1e8,
        deductible in 0.0f64..1e6,
        limit in 0.0f64..1e7,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(net_loss(lo, deductible, limit) <= net_loss(hi, deductible, limit) + 1e-6);
    }

    #[test]
    fn prop_recovery_is_capped_by_limit(
        gross in 0.0f64..1e9,
        deductible in 0.0f64..1e7,
        limit in 0.0f64..1e8,
    ) {
        let recovered = gross - net_loss(gross, deductible, limit);
        prop_assert!(recovered <= limit + 1e-6);
    }
}
