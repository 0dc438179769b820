//! Execution scheduler: decides WHERE a simulation runs, not what it computes.
//!
//! RULES:
//!   - Runs of at most `sync_threshold` iterations execute on the caller.
//!   - Larger runs go to one background worker thread. Starting any new
//!     run cancels the previous worker (fire-and-forget).
//!   - Every run gets a fresh generation number. A worker message is
//!     accepted only if its generation is the latest requested one.
//!   - Input/control edits arm a single-slot debounce timer; when it fires,
//!     a live preview runs on the debounced snapshot. Explicit runs use the
//!     latest raw state and disarm the timer.
//!   - A failed worker never reaches the caller as an error: it is logged
//!     and replaced by a synchronous run at reduced iteration count.
//!
//! Time is passed in as `Instant` so the debounce logic never sleeps.

use crate::{
    command::ScenarioCommand,
    config::{EngineConfig, ScenarioConfig},
    controls::{ControlDefinition, ControlLevels},
    driver::{CancelToken, SimulationDriver, SimulationRequest, SimulationResults},
    error::{EngineError, EngineResult},
    inputs::{effective_inputs, EffectiveInputs, RiskInputs},
    insurance::InsurancePolicy,
    rng::{RngBank, SimRng, StreamSlot},
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// What a background worker runs. `SimulationDriver` is the production
/// implementation; the seam exists so the worker boundary can be exercised.
pub trait SimulationBackend: Send + Sync {
    fn simulate(
        &self,
        request: &SimulationRequest,
        rng: &mut SimRng,
        cancel: &CancelToken,
    ) -> EngineResult<SimulationResults>;
}

impl SimulationBackend for SimulationDriver {
    fn simulate(
        &self,
        request: &SimulationRequest,
        rng: &mut SimRng,
        cancel: &CancelToken,
    ) -> EngineResult<SimulationResults> {
        self.run_cancellable(request, rng, cancel)
    }
}

/// The mutable UI state the engine snapshots at resolution time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioState {
    pub inputs: RiskInputs,
    pub levels: ControlLevels,
    pub policy: InsurancePolicy,
    pub iteration_count: usize,
}

impl ScenarioState {
    /// Initial UI state for a scenario, at the live-preview iteration count.
    pub fn from_scenario(scenario: &ScenarioConfig) -> Self {
        Self {
            inputs: scenario.inputs.clone(),
            levels: scenario.initial_maturity.clone(),
            policy: scenario.insurance(),
            iteration_count: scenario.engine.live_iterations,
        }
    }

    pub fn effective(&self, definitions: &[ControlDefinition]) -> EffectiveInputs {
        effective_inputs(&self.inputs, &self.levels, definitions)
    }
}

/// Single-slot debounce timer. Re-arming replaces the pending deadline.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once per arming, when `now` reaches the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// One-shot reply from a background worker.
#[derive(Debug)]
pub enum WorkerMessage {
    Completed {
        generation: u64,
        results: SimulationResults,
    },
    Failed {
        generation: u64,
        reason: String,
    },
}

impl WorkerMessage {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Completed { generation, .. } | Self::Failed { generation, .. } => *generation,
        }
    }
}

/// Outcome of asking for a run.
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Ran on the caller; results are already current.
    Completed(Arc<SimulationResults>),
    /// Handed to a background worker.
    Started { generation: u64 },
}

struct InFlight {
    generation: u64,
    iteration_count: usize,
    cancel: CancelToken,
    // Dropping the handle detaches the thread.
    _handle: thread::JoinHandle<()>,
}

pub struct Scheduler {
    config: EngineConfig,
    definitions: Vec<ControlDefinition>,
    state: ScenarioState,
    debounced: ScenarioState,
    debouncer: Debouncer,
    rng_bank: RngBank,
    generation: u64,
    driver: Arc<SimulationDriver>,
    backend: Arc<dyn SimulationBackend>,
    in_flight: Option<InFlight>,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    latest: Option<Arc<SimulationResults>>,
}

impl Scheduler {
    pub fn new(
        config: EngineConfig,
        definitions: Vec<ControlDefinition>,
        state: ScenarioState,
        seed: u64,
    ) -> Self {
        let driver = Arc::new(SimulationDriver::new(config));
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            debouncer: Debouncer::new(config.debounce()),
            debounced: state.clone(),
            state,
            config,
            definitions,
            rng_bank: RngBank::new(seed),
            generation: 0,
            backend: driver.clone(),
            driver,
            in_flight: None,
            tx,
            rx,
            latest: None,
        }
    }

    pub fn from_scenario(scenario: &ScenarioConfig, seed: u64) -> Self {
        Self::new(
            scenario.engine,
            scenario.controls.clone(),
            ScenarioState::from_scenario(scenario),
            seed,
        )
    }

    /// Replace what background workers execute.
    pub fn with_backend(mut self, backend: Arc<dyn SimulationBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn state(&self) -> &ScenarioState {
        &self.state
    }

    /// The snapshot the last live preview ran on.
    pub fn debounced(&self) -> &ScenarioState {
        &self.debounced
    }

    pub fn definitions(&self) -> &[ControlDefinition] {
        &self.definitions
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn preview_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn latest(&self) -> Option<Arc<SimulationResults>> {
        self.latest.clone()
    }

    /// Apply a UI mutation. Input and control edits arm the preview timer.
    pub fn apply(&mut self, command: ScenarioCommand, now: Instant) -> EngineResult<()> {
        let triggers_preview = command.triggers_preview();
        match command {
            ScenarioCommand::SetInput { variable, input } => {
                self.state.inputs.set(variable, input)?;
            }
            ScenarioCommand::SetMaturity { control_id, level } => {
                if !self.definitions.iter().any(|d| d.id == control_id) {
                    return Err(EngineError::UnknownControl { control_id });
                }
                self.state.levels.set(&control_id, level)?;
            }
            ScenarioCommand::SetInsurance { policy } => {
                policy.validate()?;
                self.state.policy = policy;
            }
            ScenarioCommand::SetIterations { count } => {
                self.state.iteration_count = count;
            }
        }
        if triggers_preview {
            self.debouncer.arm(now);
        }
        Ok(())
    }

    /// Fire the live preview if the debounce window has elapsed.
    pub fn tick(&mut self, now: Instant) -> EngineResult<Option<Arc<SimulationResults>>> {
        if !self.debouncer.fire(now) {
            return Ok(None);
        }
        self.debounced = self.state.clone();
        let snapshot = self.debounced.clone();
        match self.dispatch(&snapshot, self.config.live_iterations, false)? {
            Dispatch::Completed(results) => Ok(Some(results)),
            Dispatch::Started { .. } => Ok(None),
        }
    }

    /// Explicit run on the latest raw state, bypassing the debounce.
    pub fn run_simulation(
        &mut self,
        iteration_count: usize,
        run_sensitivity: bool,
    ) -> EngineResult<Dispatch> {
        self.debouncer.disarm();
        self.debounced = self.state.clone();
        let snapshot = self.state.clone();
        self.dispatch(&snapshot, iteration_count, run_sensitivity)
    }

    /// Run at the state's configured iteration count.
    pub fn run_configured(&mut self) -> EngineResult<Dispatch> {
        let count = self.state.iteration_count;
        self.run_simulation(count, false)
    }

    fn dispatch(
        &mut self,
        snapshot: &ScenarioState,
        iteration_count: usize,
        run_sensitivity: bool,
    ) -> EngineResult<Dispatch> {
        self.generation += 1;
        let generation = self.generation;
        self.cancel_in_flight();

        let inputs = snapshot.effective(&self.definitions);

        if iteration_count <= self.config.sync_threshold {
            let request = SimulationRequest {
                generation,
                inputs,
                policy: snapshot.policy,
                iteration_count,
                run_sensitivity,
                sample_cap: self.config.live_sample_cap,
                sensitivity_seed: self.rng_bank.seed_for(StreamSlot::Sensitivity, generation),
            };
            let results = self.run_sync(&request, StreamSlot::Live)?;
            return Ok(Dispatch::Completed(results));
        }

        let request = SimulationRequest {
            generation,
            inputs,
            policy: snapshot.policy,
            iteration_count,
            run_sensitivity: run_sensitivity
                || iteration_count >= self.config.sensitivity_threshold,
            sample_cap: self.config.worker_sample_cap,
            sensitivity_seed: self.rng_bank.seed_for(StreamSlot::Sensitivity, generation),
        };
        self.spawn_worker(request);
        Ok(Dispatch::Started { generation })
    }

    fn run_sync(
        &mut self,
        request: &SimulationRequest,
        slot: StreamSlot,
    ) -> EngineResult<Arc<SimulationResults>> {
        let mut rng = self.rng_bank.stream(slot, request.generation);
        let results = Arc::new(self.driver.run(request, &mut rng)?);
        self.latest = Some(results.clone());
        Ok(results)
    }

    fn spawn_worker(&mut self, request: SimulationRequest) {
        let generation = request.generation;
        let iteration_count = request.iteration_count;
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        let mut rng = self.rng_bank.stream(StreamSlot::Worker, generation);

        log::debug!("gen={generation} dispatching {iteration_count} trials to worker");

        let handle = thread::spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                backend.simulate(&request, &mut rng, &worker_cancel)
            }));
            let message = match outcome {
                Ok(Ok(results)) => WorkerMessage::Completed { generation, results },
                Ok(Err(EngineError::Cancelled { .. })) => return,
                Ok(Err(e)) => WorkerMessage::Failed { generation, reason: e.to_string() },
                Err(payload) => WorkerMessage::Failed {
                    generation,
                    reason: panic_reason(payload.as_ref()),
                },
            };
            // The scheduler may be gone; nobody is left to tell.
            let _ = tx.send(message);
        });

        self.in_flight = Some(InFlight {
            generation,
            iteration_count,
            cancel,
            _handle: handle,
        });
    }

    fn cancel_in_flight(&mut self) {
        if let Some(old) = self.in_flight.take() {
            log::debug!("gen={} superseded, cancelling worker", old.generation);
            old.cancel.cancel();
        }
    }

    /// Drain worker messages without blocking. Returns newly accepted results.
    pub fn poll(&mut self) -> EngineResult<Option<Arc<SimulationResults>>> {
        let mut accepted = None;
        while let Ok(message) = self.rx.try_recv() {
            if let Some(results) = self.accept(message)? {
                accepted = Some(results);
            }
        }
        Ok(accepted)
    }

    /// Block until the in-flight run resolves or `timeout` elapses.
    /// With nothing in flight, returns the latest results immediately.
    pub fn wait(&mut self, timeout: Duration) -> EngineResult<Option<Arc<SimulationResults>>> {
        let deadline = Instant::now() + timeout;
        while self.in_flight.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => {
                    if let Some(results) = self.accept(message)? {
                        return Ok(Some(results));
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Ok(None);
                }
            }
        }
        Ok(self.latest.clone())
    }

    fn accept(&mut self, message: WorkerMessage) -> EngineResult<Option<Arc<SimulationResults>>> {
        let generation = message.generation();
        let current = self
            .in_flight
            .as_ref()
            .filter(|f| f.generation == generation && generation == self.generation);
        let Some(flight) = current else {
            if let WorkerMessage::Failed { reason, .. } = &message {
                log::warn!("gen={generation} superseded worker failed: {reason}");
            } else {
                log::debug!("gen={generation} stale result dropped (latest={})", self.generation);
            }
            return Ok(None);
        };
        let iteration_count = flight.iteration_count;
        self.in_flight = None;

        match message {
            WorkerMessage::Completed { results, .. } => {
                let results = Arc::new(results);
                self.latest = Some(results.clone());
                Ok(Some(results))
            }
            WorkerMessage::Failed { reason, .. } => {
                let reduced = iteration_count.min(self.config.fallback_iteration_cap);
                let failure = EngineError::WorkerFailed { generation, reason };
                log::warn!("{failure}; falling back to {reduced} synchronous trials");
                let snapshot = self.state.clone();
                let request = SimulationRequest {
                    generation,
                    inputs: snapshot.effective(&self.definitions),
                    policy: snapshot.policy,
                    iteration_count: reduced,
                    run_sensitivity: false,
                    sample_cap: self.config.live_sample_cap,
                    sensitivity_seed: self.rng_bank.seed_for(StreamSlot::Sensitivity, generation),
                };
                self.run_sync(&request, StreamSlot::Fallback).map(Some)
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
