//! Fixed-step ODE solvers.
//!
//! Every solver turns a system, an initial state and a step size into a lazy,
//! unbounded stream of states. Arguments are validated when `solve` is
//! called; the stream then does one step of work per pulled element. Streams
//! own their stepper and buffers, so independent `solve` calls share nothing
//! mutable.

pub mod euler;
pub mod extrapolation;
pub mod midpoint;
pub mod registry;
pub mod runge_kutta;
pub mod semi_implicit;

pub use euler::ExplicitEuler;
pub use extrapolation::Extrapolation;
pub use midpoint::ExplicitMidpoint;
pub use registry::SolverRegistry;
pub use runge_kutta::{ButcherTableau, RungeKutta};
pub use semi_implicit::SemiImplicitMidpoint;

use crate::error::SolverError;
use crate::state::DynamicSystemState;
use crate::stepper::Stepper;
use crate::traits::SharedSystem;
use serde::Serialize;
use std::sync::Arc;

/// Static metadata shown to users when choosing a solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolverDescription {
    pub name: String,
    /// Order of accuracy.
    pub order: u32,
    /// Time-reversible methods have an error expansion in even powers of the
    /// step, which extrapolation exploits.
    pub symmetric: bool,
}

impl SolverDescription {
    pub fn new(name: impl Into<String>, order: u32, symmetric: bool) -> Self {
        Self {
            name: name.into(),
            order,
            symmetric,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveParameters {
    pub step_size: f64,
}

impl SolveParameters {
    pub fn new(step_size: f64) -> Self {
        Self { step_size }
    }
}

/// Lazy sequence of states. Ends only after yielding an error.
pub type StateStream = Box<dyn Iterator<Item = Result<DynamicSystemState, SolverError>> + Send>;

pub trait OdeSolver: Send + Sync {
    fn description(&self) -> SolverDescription;

    fn solve(
        &self,
        system: SharedSystem,
        initial: &DynamicSystemState,
        parameters: SolveParameters,
    ) -> Result<StateStream, SolverError>;
}

/// Validated starting point shared by every stream: the system, the state in
/// system order and a fresh stepper.
pub(crate) struct StreamStart {
    pub system: SharedSystem,
    pub names: Arc<[String]>,
    pub stepper: Stepper,
    pub state: Vec<f64>,
}

impl StreamStart {
    pub fn new(
        system: SharedSystem,
        initial: &DynamicSystemState,
        parameters: SolveParameters,
    ) -> Result<Self, SolverError> {
        let stepper = Stepper::new(parameters.step_size, initial.independent())?;
        let state = initial.ordered_values(system.variables())?;
        let names: Arc<[String]> = system.variables().to_vec().into();
        Ok(Self {
            system,
            names,
            stepper,
            state,
        })
    }

    pub fn snapshot(&self, independent: f64) -> DynamicSystemState {
        log::trace!("t = {independent}: {:?}", self.state);
        DynamicSystemState::from_parts(independent, Arc::clone(&self.names), self.state.clone())
    }
}
