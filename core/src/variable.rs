//! The fixed catalogue of model variables.
//!
//! Each variable declares its semantic kind here, once. The control
//! resolver dispatches on `VariableKind`, never on the variable's name.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which control-multiplier family scales a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Probability,
    Time,
    Cost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskVariable {
    /// Threat event frequency, attempts per year.
    #[serde(rename = "TEF")]
    Tef,
    #[serde(rename = "P_InitialAccess")]
    InitialAccess,
    #[serde(rename = "P_IFSReachable")]
    IfsReachable,
    #[serde(rename = "P_WriteAccess")]
    WriteAccess,
    #[serde(rename = "Cost_IR")]
    IncidentResponseCost,
    #[serde(rename = "Cost_Recovery")]
    RecoveryCost,
    #[serde(rename = "T_DetectDays")]
    DetectDays,
    #[serde(rename = "T_RecoveryDays")]
    RecoveryDays,
    #[serde(rename = "Cost_DowntimePerDay")]
    DowntimeCostPerDay,
    /// Probability that an event escalates into secondary losses.
    #[serde(rename = "P_Secondary")]
    Secondary,
}

impl RiskVariable {
    pub const ALL: [RiskVariable; 10] = [
        Self::Tef,
        Self::InitialAccess,
        Self::IfsReachable,
        Self::WriteAccess,
        Self::IncidentResponseCost,
        Self::RecoveryCost,
        Self::DetectDays,
        Self::RecoveryDays,
        Self::DowntimeCostPerDay,
        Self::Secondary,
    ];

    /// The attack chain: an event happens only if every link succeeds.
    pub const FREQUENCY_CHAIN: [RiskVariable; 4] = [
        Self::Tef,
        Self::InitialAccess,
        Self::IfsReachable,
        Self::WriteAccess,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Tef => "TEF",
            Self::InitialAccess => "P_InitialAccess",
            Self::IfsReachable => "P_IFSReachable",
            Self::WriteAccess => "P_WriteAccess",
            Self::IncidentResponseCost => "Cost_IR",
            Self::RecoveryCost => "Cost_Recovery",
            Self::DetectDays => "T_DetectDays",
            Self::RecoveryDays => "T_RecoveryDays",
            Self::DowntimeCostPerDay => "Cost_DowntimePerDay",
            Self::Secondary => "P_Secondary",
        }
    }

    pub fn kind(&self) -> VariableKind {
        match self {
            Self::Tef
            | Self::InitialAccess
            | Self::IfsReachable
            | Self::WriteAccess
            | Self::Secondary => VariableKind::Probability,
            Self::DetectDays | Self::RecoveryDays => VariableKind::Time,
            Self::IncidentResponseCost | Self::RecoveryCost | Self::DowntimeCostPerDay => {
                VariableKind::Cost
            }
        }
    }
}

impl fmt::Display for RiskVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RiskVariable {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.key() == s)
            .ok_or_else(|| EngineError::UnknownVariable { key: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_from_str() {
        for v in RiskVariable::ALL {
            assert_eq!(v.key().parse::<RiskVariable>().unwrap(), v);
        }
    }

    #[test]
    fn serde_uses_catalogue_keys() {
        let json = serde_json::to_string(&RiskVariable::DowntimeCostPerDay).unwrap();
        assert_eq!(json, "\"Cost_DowntimePerDay\"");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = "P_Moon".parse::<RiskVariable>().unwrap_err();
        assert!(matches!(err, EngineError::UnknownVariable { .. }));
    }

    #[test]
    fn kinds_follow_catalogue() {
        assert_eq!(RiskVariable::Tef.kind(), VariableKind::Probability);
        assert_eq!(RiskVariable::Secondary.kind(), VariableKind::Probability);
        assert_eq!(RiskVariable::DetectDays.kind(), VariableKind::Time);
        assert_eq!(RiskVariable::RecoveryCost.kind(), VariableKind::Cost);
    }
}
