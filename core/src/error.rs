use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid triangular input for {variable}: min={min}, mode={mode}, max={max}")]
    InvalidTriangular {
        variable: String,
        min: f64,
        mode: f64,
        max: f64,
    },

    #[error("Maturity level {level} for control '{control_id}' is outside 0..=5")]
    InvalidMaturity { control_id: String, level: u8 },

    #[error("Invalid insurance policy: deductible={deductible}, coverage_limit={coverage_limit}")]
    InvalidPolicy { deductible: f64, coverage_limit: f64 },

    #[error("Unknown input variable '{key}'")]
    UnknownVariable { key: String },

    #[error("Unknown control '{control_id}'")]
    UnknownControl { control_id: String },

    #[error("Simulation generation {generation} cancelled")]
    Cancelled { generation: u64 },

    #[error("Background worker for generation {generation} failed: {reason}")]
    WorkerFailed { generation: u64, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
