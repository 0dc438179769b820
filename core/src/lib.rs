//! Monte Carlo cyber-loss engine for the FAIR/FMVA training simulator.
//!
//! Data flow:
//!   UI edits → `scheduler` (debounce, dispatch) → `inputs` (control
//!   multipliers) → `driver` → `iteration` (loop) → `sampler` + `insurance`
//!   → `SimulationResults` → `finance` and the UI.

pub mod command;
pub mod config;
pub mod controls;
pub mod driver;
pub mod error;
pub mod finance;
pub mod inputs;
pub mod insurance;
pub mod iteration;
pub mod rng;
pub mod sampler;
pub mod scheduler;
pub mod variable;

pub use driver::{SimulationDriver, SimulationRequest, SimulationResults};
pub use error::{EngineError, EngineResult};
pub use scheduler::{Dispatch, Scheduler, ScenarioState};
