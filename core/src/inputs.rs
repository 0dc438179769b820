//! Baseline input distributions and the control resolver that turns
//! them into the effective (post-control) distributions the engine samples.

use crate::{
    controls::{multiplier_for, ControlDefinition, ControlLevels},
    error::{EngineError, EngineResult},
    rng::UniformSource,
    sampler::sample_triangular,
    variable::RiskVariable,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Triangular descriptor. Missing bounds default to `mode * 0.5` and
/// `mode * 1.5` when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    pub mode: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl TriangularInput {
    pub fn new(min: f64, mode: f64, max: f64) -> Self {
        Self { min: Some(min), mode, max: Some(max) }
    }

    pub fn from_mode(mode: f64) -> Self {
        Self { min: None, mode, max: None }
    }

    /// Resolved (min, mode, max), filling defaults for missing bounds.
    pub fn bounds(&self) -> (f64, f64, f64) {
        let (lo, hi) = {
            let a = self.mode * 0.5;
            let b = self.mode * 1.5;
            (a.min(b), a.max(b))
        };
        (self.min.unwrap_or(lo), self.mode, self.max.unwrap_or(hi))
    }

    pub fn validate(&self, variable: RiskVariable) -> EngineResult<()> {
        let (min, mode, max) = self.bounds();
        let finite = min.is_finite() && mode.is_finite() && max.is_finite();
        if !finite || min > mode || mode > max {
            return Err(EngineError::InvalidTriangular {
                variable: variable.key().to_string(),
                min,
                mode,
                max,
            });
        }
        Ok(())
    }

    /// Multiply every present bound by `factor`. Absent bounds stay absent.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            min: self.min.map(|v| v * factor),
            mode: self.mode * factor,
            max: self.max.map(|v| v * factor),
        }
    }

    pub fn sample(&self, rng: &mut impl UniformSource) -> f64 {
        let (min, mode, max) = self.bounds();
        sample_triangular(rng, min, mode, max)
    }
}

/// Baseline (pre-control) inputs, as held in UI state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskInputs(BTreeMap<RiskVariable, TriangularInput>);

impl RiskInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variable: RiskVariable) -> Option<&TriangularInput> {
        self.0.get(&variable)
    }

    /// Validated insert.
    pub fn set(&mut self, variable: RiskVariable, input: TriangularInput) -> EngineResult<()> {
        input.validate(variable)?;
        self.0.insert(variable, input);
        Ok(())
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (variable, input) in &self.0 {
            input.validate(*variable)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiskVariable, &TriangularInput)> {
        self.0.iter().map(|(v, i)| (*v, i))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(RiskVariable, TriangularInput)> for RiskInputs {
    fn from_iter<I: IntoIterator<Item = (RiskVariable, TriangularInput)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Post-control distributions. Derived, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EffectiveInputs(BTreeMap<RiskVariable, TriangularInput>);

impl EffectiveInputs {
    pub fn get(&self, variable: RiskVariable) -> Option<&TriangularInput> {
        self.0.get(&variable)
    }

    /// Draw `variable`; a missing variable contributes 0.
    pub fn sample_or_zero(&self, variable: RiskVariable, rng: &mut impl UniformSource) -> f64 {
        self.0.get(&variable).map_or(0.0, |input| input.sample(rng))
    }

    /// Copy with one variable's distribution scaled by `factor`.
    pub fn perturbed(&self, variable: RiskVariable, factor: f64) -> Self {
        let mut out = self.clone();
        if let Some(input) = out.0.get_mut(&variable) {
            *input = input.scaled(factor);
        }
        out
    }
}

impl FromIterator<(RiskVariable, TriangularInput)> for EffectiveInputs {
    fn from_iter<I: IntoIterator<Item = (RiskVariable, TriangularInput)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Product of the multipliers of every control affecting `variable`.
pub fn aggregate_multiplier(
    variable: RiskVariable,
    levels: &ControlLevels,
    definitions: &[ControlDefinition],
) -> f64 {
    definitions
        .iter()
        .filter(|def| def.affects(variable))
        .map(|def| multiplier_for(variable.kind(), levels.get(&def.id)))
        .product()
}

/// Apply current control maturity to the baseline inputs. Pure.
pub fn effective_inputs(
    inputs: &RiskInputs,
    levels: &ControlLevels,
    definitions: &[ControlDefinition],
) -> EffectiveInputs {
    inputs
        .iter()
        .map(|(variable, input)| {
            let factor = aggregate_multiplier(variable, levels, definitions);
            (variable, input.scaled(factor))
        })
        .collect()
}
