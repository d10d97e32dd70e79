use super::{OdeSolver, SolveParameters, SolverDescription, StateStream, StreamStart};
use crate::error::SolverError;
use crate::state::DynamicSystemState;
use crate::traits::SharedSystem;

/// x_{n+1} = x_n + Δ f(t_n, x_n)
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitEuler;

impl OdeSolver for ExplicitEuler {
    fn description(&self) -> SolverDescription {
        SolverDescription::new("Explicit Euler", 1, false)
    }

    fn solve(
        &self,
        system: SharedSystem,
        initial: &DynamicSystemState,
        parameters: SolveParameters,
    ) -> Result<StateStream, SolverError> {
        let mut start = StreamStart::new(system, initial, parameters)?;
        log::debug!(
            "Explicit Euler: {} variable(s), step {}",
            start.state.len(),
            parameters.step_size
        );
        let mut rate = vec![0.0; start.state.len()];
        Ok(Box::new(std::iter::from_fn(move || {
            let t = start.stepper.current().to;
            let step = start.stepper.advance();
            start.system.apply(t, &start.state, &mut rate);
            for (x, dx) in start.state.iter_mut().zip(&rate) {
                *x += step.delta * dx;
            }
            Some(Ok(start.snapshot(step.to)))
        })))
    }
}
