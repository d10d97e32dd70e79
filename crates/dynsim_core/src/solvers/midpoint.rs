use super::{OdeSolver, SolveParameters, SolverDescription, StateStream, StreamStart};
use crate::error::SolverError;
use crate::state::DynamicSystemState;
use crate::traits::SharedSystem;

/// Leapfrog form of the explicit midpoint rule:
/// x_{n+1} = x_{n-1} + 2Δ f(t_n, x_n).
///
/// The first point comes from a single Euler step, after which the stream
/// keeps exactly one state of history.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitMidpoint;

impl OdeSolver for ExplicitMidpoint {
    fn description(&self) -> SolverDescription {
        SolverDescription::new("Explicit midpoint", 2, true)
    }

    fn solve(
        &self,
        system: SharedSystem,
        initial: &DynamicSystemState,
        parameters: SolveParameters,
    ) -> Result<StateStream, SolverError> {
        let mut start = StreamStart::new(system, initial, parameters)?;
        log::debug!(
            "Explicit midpoint: {} variable(s), step {}",
            start.state.len(),
            parameters.step_size
        );
        let mut previous: Option<Vec<f64>> = None;
        let mut rate = vec![0.0; start.state.len()];
        Ok(Box::new(std::iter::from_fn(move || {
            let t = start.stepper.current().to;
            let step = start.stepper.advance();
            start.system.apply(t, &start.state, &mut rate);
            let next: Vec<f64> = match previous.as_ref() {
                None => start
                    .state
                    .iter()
                    .zip(&rate)
                    .map(|(x, dx)| x + step.delta * dx)
                    .collect(),
                Some(back) => back
                    .iter()
                    .zip(&rate)
                    .map(|(x, dx)| x + 2.0 * step.delta * dx)
                    .collect(),
            };
            previous = Some(std::mem::replace(&mut start.state, next));
            Some(Ok(start.snapshot(step.to)))
        })))
    }
}
