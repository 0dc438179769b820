//! One stochastic trial: one simulated year of the fixed causal model.
//!
//!   1. Sample the attack chain (TEF × access probabilities) → λ
//!   2. Draw the year's event count from Poisson(λ)
//!   3. Per event: primary cost (IR + recovery + downtime) and, with
//!      probability P_Secondary, the fixed secondary-loss bundle
//!   4. Gross annual loss → insurance layer → net annual loss
//!
//! Missing variables contribute 0. A partial input set is a valid,
//! if quiet, scenario.

use crate::{
    inputs::EffectiveInputs,
    insurance::InsurancePolicy,
    rng::UniformSource,
    sampler::{sample_bernoulli, sample_poisson},
    variable::RiskVariable,
};
use serde::{Deserialize, Serialize};

/// Fixed costs added when an event escalates into secondary loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryLossBundle {
    pub legal: f64,
    pub notification: f64,
    pub churn: f64,
}

impl Default for SecondaryLossBundle {
    fn default() -> Self {
        Self {
            legal: 750_000.0,
            notification: 250_000.0,
            churn: 500_000.0,
        }
    }
}

impl SecondaryLossBundle {
    pub fn total(&self) -> f64 {
        self.legal + self.notification + self.churn
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    pub gross: f64,
    pub net: f64,
}

/// Expected events per year: TEF scaled by every link of the chain.
pub fn event_rate(inputs: &EffectiveInputs, rng: &mut impl UniformSource) -> f64 {
    RiskVariable::FREQUENCY_CHAIN
        .iter()
        .map(|v| inputs.sample_or_zero(*v, rng))
        .product()
}

/// Primary cost of a single event.
fn primary_event_cost(inputs: &EffectiveInputs, rng: &mut impl UniformSource) -> f64 {
    let ir = inputs.sample_or_zero(RiskVariable::IncidentResponseCost, rng);
    let recovery = inputs.sample_or_zero(RiskVariable::RecoveryCost, rng);
    let detect_days = inputs.sample_or_zero(RiskVariable::DetectDays, rng);
    let recovery_days = inputs.sample_or_zero(RiskVariable::RecoveryDays, rng);
    let per_day = inputs.sample_or_zero(RiskVariable::DowntimeCostPerDay, rng);

    let downtime = (detect_days + recovery_days) * per_day;
    ir + recovery + downtime
}

pub fn run_one_iteration(
    inputs: &EffectiveInputs,
    policy: &InsurancePolicy,
    secondary: &SecondaryLossBundle,
    rng: &mut impl UniformSource,
) -> TrialOutcome {
    let lambda = event_rate(inputs, rng);
    let event_count = sample_poisson(rng, lambda);

    let mut gross = 0.0;
    for _ in 0..event_count {
        let primary = primary_event_cost(inputs, rng);
        let p_secondary = inputs.sample_or_zero(RiskVariable::Secondary, rng);
        let secondary_cost = if sample_bernoulli(rng, p_secondary) == 1 {
            secondary.total()
        } else {
            0.0
        };
        gross += primary + secondary_cost;
    }

    TrialOutcome {
        gross,
        net: policy.net_loss(gross),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::TriangularInput;

    /// Replays a fixed list of draws.
    struct Fixed(Vec<f64>);

    impl UniformSource for Fixed {
        fn next_f64(&mut self) -> f64 {
            self.0.remove(0)
        }
    }

    /// Zero-width inputs consume no draws, so every uniform below goes to
    /// the Poisson and Bernoulli samplers. Each event costs
    /// 100 + 200 + (1 + 1) * 115 = 530 before secondary loss.
    fn pinned_inputs() -> EffectiveInputs {
        use RiskVariable as V;
        let point = |v: f64| TriangularInput::new(v, v, v);
        [
            (V::Tef, point(3.0)),
            (V::InitialAccess, point(1.0)),
            (V::IfsReachable, point(1.0)),
            (V::WriteAccess, point(1.0)),
            (V::IncidentResponseCost, point(100.0)),
            (V::RecoveryCost, point(200.0)),
            (V::DetectDays, point(1.0)),
            (V::RecoveryDays, point(1.0)),
            (V::DowntimeCostPerDay, point(115.0)),
            (V::Secondary, point(0.5)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn event_rate_is_product_of_chain() {
        let mut rng = Fixed(vec![]);
        assert_eq!(event_rate(&pinned_inputs(), &mut rng), 3.0);
    }

    #[test]
    fn pinned_trial_sums_primary_and_secondary_costs() {
        // Poisson(3): 0.9 * 0.5 * 0.5 * 0.1 = 0.0225 <= e^-3 after four
        // draws, so three events. Secondary fires on 0.01 and 0.1, not 0.9.
        let mut rng = Fixed(vec![0.9, 0.5, 0.5, 0.1, 0.01, 0.1, 0.9]);
        let policy = InsurancePolicy { deductible: 0.0, coverage_limit: 0.0 };

        let outcome = run_one_iteration(
            &pinned_inputs(),
            &policy,
            &SecondaryLossBundle::default(),
            &mut rng,
        );

        let expected = 3.0 * 530.0 + 2.0 * 1_500_000.0;
        assert!((outcome.gross - expected).abs() < 1e-6, "gross = {}", outcome.gross);
        // No cover: the insured keeps everything.
        assert_eq!(outcome.net, outcome.gross);
        assert!(rng.0.is_empty(), "unconsumed draws: {:?}", rng.0);
    }

    #[test]
    fn insurance_applies_to_the_annual_total() {
        let mut rng = Fixed(vec![0.9, 0.5, 0.5, 0.1, 0.01, 0.1, 0.9]);
        let policy = InsurancePolicy { deductible: 1_000.0, coverage_limit: 2_000_000.0 };

        let outcome = run_one_iteration(
            &pinned_inputs(),
            &policy,
            &SecondaryLossBundle::default(),
            &mut rng,
        );

        // 3_001_590 - min(3_000_590, 2_000_000)
        assert!((outcome.net - 1_001_590.0).abs() < 1e-6, "net = {}", outcome.net);
    }

    #[test]
    fn zero_rate_year_draws_nothing_and_loses_nothing() {
        let inputs = pinned_inputs().perturbed(RiskVariable::WriteAccess, 0.0);
        let mut rng = Fixed(vec![]);

        let outcome = run_one_iteration(
            &inputs,
            &InsurancePolicy::default(),
            &SecondaryLossBundle::default(),
            &mut rng,
        );

        assert_eq!(outcome, TrialOutcome { gross: 0.0, net: 0.0 });
    }
}
