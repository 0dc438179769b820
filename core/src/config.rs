use crate::{
    controls::{ControlDefinition, ControlLevels},
    inputs::{RiskInputs, TriangularInput},
    insurance::InsurancePolicy,
    iteration::SecondaryLossBundle,
    variable::RiskVariable,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ── Engine tunables ────────────────────────────────────────────────

/// Thresholds and caps for the driver and scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Runs at or below this many iterations execute on the caller.
    pub sync_threshold: usize,
    /// Runs at or above this many iterations request the sensitivity sweep.
    pub sensitivity_threshold: usize,
    /// The driver never sweeps below this many iterations.
    pub sensitivity_min_iterations: usize,
    pub sensitivity_trials_cap: usize,
    pub sensitivity_factor: f64,
    pub live_sample_cap: usize,
    pub worker_sample_cap: usize,
    pub fallback_iteration_cap: usize,
    pub live_iterations: usize,
    pub debounce_ms: u64,
    pub secondary_loss: SecondaryLossBundle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_threshold: 3_000,
            sensitivity_threshold: 10_000,
            sensitivity_min_iterations: 1_000,
            sensitivity_trials_cap: 2_000,
            sensitivity_factor: 1.1,
            live_sample_cap: 1_000,
            worker_sample_cap: 5_000,
            fallback_iteration_cap: 5_000,
            live_iterations: IterationPreset::Live.count(),
            debounce_ms: 500,
            secondary_loss: SecondaryLossBundle::default(),
        }
    }
}

impl EngineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Iteration counts offered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationPreset {
    Live,
    Standard,
    Refine,
    Deep,
}

impl IterationPreset {
    pub fn count(&self) -> usize {
        match self {
            Self::Live => 2_000,
            Self::Standard => 10_000,
            Self::Refine => 25_000,
            Self::Deep => 50_000,
        }
    }
}

// ── Scenario data ──────────────────────────────────────────────────

/// Headline loss figures published with the scenario, in millions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineLossProfile {
    pub gross_p90_millions: f64,
    pub net_p90_millions: f64,
    pub mean_loss_millions: f64,
    pub frequency_per_year: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFinancials {
    pub revenue: f64,
    pub ebitda: f64,
    pub debt_principal: f64,
    pub interest_rate: f64,
    pub debt_term_years: f64,
    pub discount_rate: f64,
    pub equity_value: f64,
    pub debt_value: f64,
    pub cost_of_equity: f64,
    pub tax_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archetype {
    pub id: String,
    pub label: String,
    pub modeled_insurance: InsurancePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    pub name: String,
    pub baseline: BaselineLossProfile,
    pub financials: CompanyFinancials,
    pub inputs: RiskInputs,
    #[serde(default)]
    pub controls: Vec<ControlDefinition>,
    #[serde(default)]
    pub initial_maturity: ControlLevels,
    #[serde(default)]
    pub archetype: Option<Archetype>,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ControlsFile {
    controls: Vec<ControlDefinition>,
    #[serde(default)]
    initial_maturity: ControlLevels,
}

impl ScenarioConfig {
    /// Modeled insurance of the selected archetype, or the fixed fallback.
    pub fn insurance(&self) -> InsurancePolicy {
        self.archetype
            .as_ref()
            .map(|a| a.modeled_insurance)
            .unwrap_or_default()
    }

    /// Load from a data directory holding `scenario.json` and,
    /// optionally, `controls.json`.
    /// In tests, use ScenarioConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/scenario.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut config: ScenarioConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;

        let controls_path = format!("{data_dir}/controls.json");
        if std::path::Path::new(&controls_path).exists() {
            let controls_content = std::fs::read_to_string(&controls_path)
                .map_err(|e| anyhow::anyhow!("Cannot read {controls_path}: {e}"))?;
            let controls_file: ControlsFile = serde_json::from_str(&controls_content)
                .map_err(|e| anyhow::anyhow!("Cannot parse {controls_path}: {e}"))?;
            config.controls = controls_file.controls;
            config.initial_maturity = controls_file.initial_maturity;
        }

        config.validate()?;
        log::debug!(
            "Loaded scenario '{}' ({} inputs, {} controls)",
            config.name,
            config.inputs.len(),
            config.controls.len()
        );
        Ok(config)
    }

    /// Reject malformed triangles, negative insurance terms and
    /// out-of-range or dangling maturity entries.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.inputs.validate()?;
        if let Some(archetype) = &self.archetype {
            archetype.modeled_insurance.validate()?;
        }
        for (control_id, level) in self.initial_maturity.iter() {
            if !self.controls.iter().any(|c| c.id == control_id) {
                anyhow::bail!("initial maturity names unknown control '{control_id}'");
            }
            // Re-setting runs the 0..=5 range check.
            ControlLevels::new().set(control_id, level)?;
        }
        Ok(())
    }

    /// Scenario with hardcoded values for use in unit tests.
    pub fn default_test() -> Self {
        use RiskVariable as V;

        let inputs: RiskInputs = [
            (V::Tef, TriangularInput::new(2.0, 4.0, 8.0)),
            (V::InitialAccess, TriangularInput::new(0.3, 0.5, 0.7)),
            (V::IfsReachable, TriangularInput::new(0.5, 0.7, 0.9)),
            (V::WriteAccess, TriangularInput::new(0.4, 0.6, 0.8)),
            (V::IncidentResponseCost, TriangularInput::new(100_000.0, 250_000.0, 600_000.0)),
            (V::RecoveryCost, TriangularInput::new(200_000.0, 500_000.0, 1_500_000.0)),
            (V::DetectDays, TriangularInput::new(1.0, 5.0, 20.0)),
            (V::RecoveryDays, TriangularInput::new(2.0, 7.0, 21.0)),
            (V::DowntimeCostPerDay, TriangularInput::from_mode(80_000.0)),
            (V::Secondary, TriangularInput::new(0.1, 0.25, 0.5)),
        ]
        .into_iter()
        .collect();

        let control = |id: &str, group: &str, label: &str, vars: &[RiskVariable]| {
            ControlDefinition {
                id: id.into(),
                group: group.into(),
                label: label.into(),
                variable_ids: vars.to_vec(),
            }
        };

        Self {
            name: "test-ransomware".into(),
            baseline: BaselineLossProfile {
                gross_p90_millions: 4.8,
                net_p90_millions: 1.9,
                mean_loss_millions: 1.6,
                frequency_per_year: 0.84,
            },
            financials: CompanyFinancials {
                revenue: 120_000_000.0,
                ebitda: 18_000_000.0,
                debt_principal: 40_000_000.0,
                interest_rate: 0.06,
                debt_term_years: 5.0,
                discount_rate: 0.09,
                equity_value: 90_000_000.0,
                debt_value: 40_000_000.0,
                cost_of_equity: 0.11,
                tax_rate: 0.25,
            },
            inputs,
            controls: vec![
                control("mfa", "identity", "Multi-factor authentication", &[V::InitialAccess]),
                control("segmentation", "network", "Network segmentation", &[V::IfsReachable, V::WriteAccess]),
                control("edr", "detection", "Endpoint detection & response", &[V::DetectDays, V::WriteAccess]),
                control("backups", "resilience", "Immutable backups", &[V::RecoveryDays, V::RecoveryCost]),
                control("ir_retainer", "response", "Incident response retainer", &[V::IncidentResponseCost, V::DetectDays]),
            ],
            initial_maturity: ControlLevels::new(),
            archetype: None,
            engine: EngineConfig::default(),
        }
    }
}
