//! Insurance layer: a per-run deductible and coverage limit applied to
//! every trial's gross annual loss.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Fallback retention when no archetype supplies modeled insurance.
pub const DEFAULT_DEDUCTIBLE: f64 = 250_000.0;
/// Fallback coverage limit when no archetype supplies modeled insurance.
pub const DEFAULT_COVERAGE_LIMIT: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurancePolicy {
    pub deductible: f64,
    pub coverage_limit: f64,
}

impl Default for InsurancePolicy {
    fn default() -> Self {
        Self {
            deductible: DEFAULT_DEDUCTIBLE,
            coverage_limit: DEFAULT_COVERAGE_LIMIT,
        }
    }
}

impl InsurancePolicy {
    pub fn net_loss(&self, gross: f64) -> f64 {
        net_loss(gross, self.deductible, self.coverage_limit)
    }

    /// Both terms must be finite and non-negative, otherwise `net_loss`
    /// could exceed the gross loss.
    pub fn validate(&self) -> EngineResult<()> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(self.deductible) || !valid(self.coverage_limit) {
            return Err(EngineError::InvalidPolicy {
                deductible: self.deductible,
                coverage_limit: self.coverage_limit,
            });
        }
        Ok(())
    }
}

/// Loss retained after insurance recovery.
///
/// Below the deductible nothing is recovered. Above it, the insurer pays
/// the excess up to `coverage_limit`.
pub fn net_loss(gross: f64, deductible: f64, coverage_limit: f64) -> f64 {
    if gross <= deductible {
        return gross;
    }
    let insured = (gross - deductible).min(coverage_limit);
    gross - insured
}
