//! Simulation driver: runs N trials and aggregates them.
//!
//! Flow per run:
//!   1. N independent calls to `run_one_iteration`
//!   2. Sort gross and net outcomes ascending
//!   3. Percentiles by linear interpolation between nearest ranks
//!   4. Optional one-at-a-time sensitivity sweep (large runs only)
//!
//! The sweep is a deliberate approximation, not a variance-based method:
//! each candidate is scaled by a fixed factor, a reduced trial count is
//! re-run, and the variable whose perturbation raises net P90 the most
//! becomes `top_driver`.

use crate::{
    config::EngineConfig,
    error::{EngineError, EngineResult},
    inputs::EffectiveInputs,
    insurance::InsurancePolicy,
    iteration::{run_one_iteration, SecondaryLossBundle},
    rng::{SimRng, StreamSlot, UniformSource},
    variable::RiskVariable,
};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Candidates for the sensitivity sweep, in tie-break order.
pub const SENSITIVITY_CANDIDATES: [RiskVariable; 5] = [
    RiskVariable::IfsReachable,
    RiskVariable::WriteAccess,
    RiskVariable::DetectDays,
    RiskVariable::Secondary,
    RiskVariable::Tef,
];

/// Reported when the sweep is skipped, and when no perturbation raises P90.
pub const DEFAULT_TOP_DRIVER: RiskVariable = SENSITIVITY_CANDIDATES[0];

/// Trials between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 256;

/// Cooperative cancellation flag shared between a scheduler and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything one run needs. Owned, so it can cross to a worker thread.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub generation: u64,
    pub inputs: EffectiveInputs,
    pub policy: InsurancePolicy,
    pub iteration_count: usize,
    pub run_sensitivity: bool,
    /// Upper bound on `loss_samples` length.
    pub sample_cap: usize,
    /// Every sweep candidate restarts from this seed, so deltas compare
    /// perturbations on common random numbers.
    pub sensitivity_seed: u64,
}

/// How much one candidate's perturbation moved net P90.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverImpact {
    pub variable: RiskVariable,
    pub p90: f64,
    pub delta: f64,
}

/// The only artifact consumers see. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResults {
    pub mean: f64,
    pub median: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub gross_p90: f64,
    pub net_p90: f64,
    pub top_driver: Option<RiskVariable>,
    pub iteration_count: usize,
    /// Sorted prefix of net losses, for histograms.
    pub loss_samples: Vec<f64>,
    pub gross_mean: f64,
    pub max_net: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensitivity: Vec<DriverImpact>,
}

/// Linear interpolation between the two nearest ranks of a sorted slice.
/// Empty input yields 0.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sort_ascending(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

pub struct SimulationDriver {
    config: EngineConfig,
}

impl SimulationDriver {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run with a token nobody else holds.
    pub fn run(
        &self,
        request: &SimulationRequest,
        rng: &mut impl UniformSource,
    ) -> EngineResult<SimulationResults> {
        self.run_cancellable(request, rng, &CancelToken::new())
    }

    pub fn run_cancellable(
        &self,
        request: &SimulationRequest,
        rng: &mut impl UniformSource,
        cancel: &CancelToken,
    ) -> EngineResult<SimulationResults> {
        log::debug!(
            "gen={} driver: {} trials, sensitivity={}",
            request.generation,
            request.iteration_count,
            request.run_sensitivity
        );

        let (mut gross, mut net) = self.trials(
            request.generation,
            &request.inputs,
            &request.policy,
            request.iteration_count,
            rng,
            cancel,
        )?;
        sort_ascending(&mut gross);
        sort_ascending(&mut net);

        let net_p90 = percentile(&net, 0.9);
        let median = percentile(&net, 0.5);

        let sweep = request.run_sensitivity
            && request.iteration_count >= self.config.sensitivity_min_iterations;
        let (top_driver, sensitivity) = if sweep {
            self.sensitivity_sweep(request, net_p90, cancel)?
        } else {
            (DEFAULT_TOP_DRIVER, Vec::new())
        };

        let results = SimulationResults {
            mean: mean(&net),
            median,
            p50: median,
            p90: net_p90,
            p95: percentile(&net, 0.95),
            gross_p90: percentile(&gross, 0.9),
            net_p90,
            top_driver: Some(top_driver),
            iteration_count: request.iteration_count,
            loss_samples: net.iter().take(request.sample_cap).copied().collect(),
            gross_mean: mean(&gross),
            max_net: net.last().copied().unwrap_or(0.0),
            sensitivity,
        };

        log::info!(
            "gen={} driver: n={} gross_p90={:.0} net_p90={:.0} top_driver={}",
            request.generation,
            results.iteration_count,
            results.gross_p90,
            results.net_p90,
            top_driver
        );
        Ok(results)
    }

    fn trials(
        &self,
        generation: u64,
        inputs: &EffectiveInputs,
        policy: &InsurancePolicy,
        count: usize,
        rng: &mut impl UniformSource,
        cancel: &CancelToken,
    ) -> EngineResult<(Vec<f64>, Vec<f64>)> {
        let secondary: &SecondaryLossBundle = &self.config.secondary_loss;
        let mut gross = Vec::with_capacity(count);
        let mut net = Vec::with_capacity(count);
        for i in 0..count {
            if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(EngineError::Cancelled { generation });
            }
            let outcome = run_one_iteration(inputs, policy, secondary, rng);
            gross.push(outcome.gross);
            net.push(outcome.net);
        }
        Ok((gross, net))
    }

    /// One-at-a-time perturbation of each candidate against `baseline_p90`.
    fn sensitivity_sweep(
        &self,
        request: &SimulationRequest,
        baseline_p90: f64,
        cancel: &CancelToken,
    ) -> EngineResult<(RiskVariable, Vec<DriverImpact>)> {
        let trials = request.iteration_count.min(self.config.sensitivity_trials_cap);
        let mut impacts = Vec::with_capacity(SENSITIVITY_CANDIDATES.len());
        let mut top: Option<(RiskVariable, f64)> = None;

        for variable in SENSITIVITY_CANDIDATES {
            let perturbed = request
                .inputs
                .perturbed(variable, self.config.sensitivity_factor);
            let mut rng = SimRng::from_seed(request.sensitivity_seed).with_name(StreamSlot::Sensitivity.name());
            let (_, mut net) = self.trials(
                request.generation,
                &perturbed,
                &request.policy,
                trials,
                &mut rng,
                cancel,
            )?;
            sort_ascending(&mut net);
            let p90 = percentile(&net, 0.9);
            let delta = p90 - baseline_p90;

            // Strictly greater: the first candidate wins ties.
            let best = top.map_or(0.0, |(_, d)| d);
            if delta > best {
                top = Some((variable, delta));
            }
            impacts.push(DriverImpact { variable, p90, delta });
        }

        let driver = top.map_or(DEFAULT_TOP_DRIVER, |(v, _)| v);
        log::debug!(
            "gen={} sensitivity: {trials} trials/candidate, top={driver}",
            request.generation
        );
        Ok((driver, impacts))
    }
}
