//! Host-independent simulation driver behind the WASM bindings.

use crate::logger;
use anyhow::{bail, Context, Result};
use dynsim_core::solvers::{SolveParameters, SolverRegistry, StateStream};
use dynsim_core::{
    DynamicSystemState, DynamicalSystem, EngineSettings, EquationSystem, SharedSystem,
};
use std::sync::Arc;

/// Parses user equations, picks a solver and keeps its state stream open so
/// that the UI can pull states in batches.
pub struct Simulation {
    variables: Vec<String>,
    solver_name: String,
    stream: Option<StateStream>,
}

/// Everything needed to start a simulation, in user-facing terms.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    /// Equations of the form `x' = expression`, one per state variable.
    pub equations: Vec<String>,
    /// Initial values in equation order.
    pub initial_values: Vec<f64>,
    pub start: f64,
    /// Registry key or display name.
    pub solver: String,
    pub step_size: f64,
    /// Extrapolation stages, 1 for the plain solver.
    pub stages: usize,
}

impl Simulation {
    /// Validates `settings`, applies their log level and opens the stream.
    pub fn new(request: &SimulationRequest, settings: &EngineSettings) -> Result<Self> {
        settings.validate()?;
        logger::install(settings.log_level);
        let system = EquationSystem::from_sources(&request.equations, settings)
            .context("Failed to build the equation system.")?;
        let variables = system.variables().to_vec();
        if request.initial_values.len() != variables.len() {
            bail!(
                "Expected {} initial value(s), got {}.",
                variables.len(),
                request.initial_values.len()
            );
        }

        let registry = SolverRegistry::standard(settings.newton)?;
        let solver = registry.build(&request.solver, request.stages)?;
        let solver_name = solver.description().name;

        let initial = DynamicSystemState::new(
            request.start,
            variables
                .iter()
                .cloned()
                .zip(request.initial_values.iter().copied()),
        );
        let shared: SharedSystem = Arc::new(system);
        let stream = solver
            .solve(shared, &initial, SolveParameters::new(request.step_size))
            .with_context(|| format!("Failed to start {solver_name}."))?;
        log::info!("Started {solver_name} for {} variable(s)", variables.len());

        Ok(Self {
            variables,
            solver_name,
            stream: Some(stream),
        })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn solver_name(&self) -> &str {
        &self.solver_name
    }

    /// True once the stream has reported an error.
    pub fn is_done(&self) -> bool {
        self.stream.is_none()
    }

    /// Pulls the next `count` states. A solver error closes the simulation.
    pub fn advance(&mut self, count: usize) -> Result<Vec<DynamicSystemState>> {
        let Some(stream) = self.stream.as_mut() else {
            bail!("Simulation has stopped.");
        };
        let mut states = Vec::with_capacity(count);
        for _ in 0..count {
            match stream.next() {
                Some(Ok(state)) => states.push(state),
                Some(Err(err)) => {
                    self.stream = None;
                    return Err(err).context(format!("{} failed.", self.solver_name));
                }
                None => {
                    self.stream = None;
                    bail!("{} stopped producing states.", self.solver_name);
                }
            }
        }
        Ok(states)
    }
}
