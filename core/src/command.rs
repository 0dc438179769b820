use crate::{
    error::EngineResult,
    inputs::TriangularInput,
    insurance::InsurancePolicy,
    variable::RiskVariable,
};
use serde::{Deserialize, Serialize};

/// All UI-issued mutations of scenario state.
/// Variants may be added, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ScenarioCommand {
    // ── Inputs and controls (debounced live preview) ──
    SetInput {
        variable: RiskVariable,
        input: TriangularInput,
    },
    SetMaturity {
        control_id: String,
        level: u8,
    },

    // ── Run parameters (no preview) ───────────────────
    SetInsurance {
        policy: InsurancePolicy,
    },
    SetIterations {
        count: usize,
    },
}

impl ScenarioCommand {
    /// Parse one command as sent by the UI, e.g.
    /// `{"cmd":"set_maturity","control_id":"mfa","level":3}`.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether applying this command should schedule a live preview.
    pub fn triggers_preview(&self) -> bool {
        matches!(self, Self::SetInput { .. } | Self::SetMaturity { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SetInput { .. } => "set_input",
            Self::SetMaturity { .. } => "set_maturity",
            Self::SetInsurance { .. } => "set_insurance",
            Self::SetIterations { .. } => "set_iterations",
        }
    }
}
