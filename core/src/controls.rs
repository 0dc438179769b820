//! Security controls and their maturity-driven multipliers.
//!
//! A control at maturity 0 leaves its variables untouched; at 5 it
//! applies its family's full strength. Multipliers never fall below
//! `MULTIPLIER_FLOOR`, so no control can zero a variable out.

use crate::{
    error::{EngineError, EngineResult},
    variable::{RiskVariable, VariableKind},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_MATURITY: u8 = 5;
pub const MULTIPLIER_FLOOR: f64 = 0.05;

pub const PROBABILITY_STRENGTH: f64 = 0.85;
pub const TIME_STRENGTH: f64 = 0.8;
pub const COST_STRENGTH: f64 = 0.7;

fn multiplier(maturity: u8, strength: f64) -> f64 {
    let level = maturity.min(MAX_MATURITY) as f64;
    (1.0 - (level / MAX_MATURITY as f64) * strength).max(MULTIPLIER_FLOOR)
}

pub fn probability_multiplier(maturity: u8) -> f64 {
    multiplier(maturity, PROBABILITY_STRENGTH)
}

pub fn time_multiplier(maturity: u8) -> f64 {
    multiplier(maturity, TIME_STRENGTH)
}

pub fn cost_multiplier(maturity: u8) -> f64 {
    multiplier(maturity, COST_STRENGTH)
}

pub fn multiplier_for(kind: VariableKind, maturity: u8) -> f64 {
    match kind {
        VariableKind::Probability => probability_multiplier(maturity),
        VariableKind::Time => time_multiplier(maturity),
        VariableKind::Cost => cost_multiplier(maturity),
    }
}

/// Declares which variables a named control affects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlDefinition {
    pub id: String,
    pub group: String,
    pub label: String,
    pub variable_ids: Vec<RiskVariable>,
}

impl ControlDefinition {
    pub fn affects(&self, variable: RiskVariable) -> bool {
        self.variable_ids.contains(&variable)
    }
}

/// Current maturity per control id. Absent controls are at level 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlLevels(BTreeMap<String, u8>);

impl ControlLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, control_id: &str) -> u8 {
        self.0.get(control_id).copied().unwrap_or(0)
    }

    pub fn set(&mut self, control_id: &str, level: u8) -> EngineResult<()> {
        if level > MAX_MATURITY {
            return Err(EngineError::InvalidMaturity {
                control_id: control_id.to_string(),
                level,
            });
        }
        self.0.insert(control_id.to_string(), level);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.0.iter().map(|(id, level)| (id.as_str(), *level))
    }
}

impl FromIterator<(String, u8)> for ControlLevels {
    fn from_iter<I: IntoIterator<Item = (String, u8)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
