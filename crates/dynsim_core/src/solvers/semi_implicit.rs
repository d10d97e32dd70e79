//! Semi-implicit midpoint rule with per-variable Newton correction.

use super::{OdeSolver, SolveParameters, SolverDescription, StateStream, StreamStart};
use crate::error::SolverError;
use crate::settings::{NewtonSettings, NonConvergencePolicy};
use crate::state::DynamicSystemState;
use crate::traits::{DynamicalSystem, SharedSystem};

/// Each step of size Δ is split into two half-steps evaluated at `t + Δ/2`.
///
/// The first half is implicit: variables are corrected one after the other,
/// each solving `v = v_prev + Δ/2 f_v(t + Δ/2, x)` by Newton iteration on the
/// Jacobian diagonal, with earlier variables already at their corrected
/// value. The second half is one explicit pass in the same sequential order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiImplicitMidpoint {
    newton: NewtonSettings,
}

impl SemiImplicitMidpoint {
    pub fn new(newton: NewtonSettings) -> Result<Self, SolverError> {
        newton.validate()?;
        Ok(Self { newton })
    }

    pub fn newton(&self) -> &NewtonSettings {
        &self.newton
    }
}

impl OdeSolver for SemiImplicitMidpoint {
    fn description(&self) -> SolverDescription {
        SolverDescription::new("Semi-implicit midpoint", 2, true)
    }

    fn solve(
        &self,
        system: SharedSystem,
        initial: &DynamicSystemState,
        parameters: SolveParameters,
    ) -> Result<StateStream, SolverError> {
        let mut start = StreamStart::new(system, initial, parameters)?;
        for (i, name) in start.system.variables().iter().enumerate() {
            if start
                .system
                .partial(i, i, initial.independent(), &start.state)
                .is_none()
            {
                return Err(SolverError::MissingJacobian(name.clone()));
            }
        }
        log::debug!(
            "Semi-implicit midpoint: {} variable(s), step {}, {:?}",
            start.state.len(),
            parameters.step_size,
            self.newton
        );

        let newton = self.newton;
        let mut failed = false;
        Ok(Box::new(std::iter::from_fn(move || {
            if failed {
                return None;
            }
            let t = start.stepper.current().to;
            let step = start.stepper.advance();
            let half = step.delta / 2.0;
            let t_mid = t + half;
            let system = start.system.as_ref();

            for i in 0..start.state.len() {
                if let Err(err) = correct(system, &newton, i, t_mid, half, step.delta, &mut start.state)
                {
                    failed = true;
                    return Some(Err(err));
                }
            }
            for i in 0..start.state.len() {
                let rate = system.apply_component(i, t_mid, &start.state);
                start.state[i] += half * rate;
            }
            Some(Ok(start.snapshot(step.to)))
        })))
    }
}

/// Newton iteration for `g(v) = v - previous - h f_i(t, x) = 0` with the
/// other components of `x` held fixed.
fn correct(
    system: &(dyn DynamicalSystem + Send + Sync),
    newton: &NewtonSettings,
    index: usize,
    t: f64,
    h: f64,
    delta: f64,
    x: &mut [f64],
) -> Result<(), SolverError> {
    let previous = x[index];
    let tolerance = delta * newton.tolerance_factor;
    for _ in 0..newton.max_iterations {
        let g = x[index] - previous - h * system.apply_component(index, t, x);
        let slope = 1.0 - h * system.partial(index, index, t, x).unwrap_or(0.0);
        let increment = g / slope;
        x[index] -= increment;
        if increment.abs() < tolerance {
            return Ok(());
        }
    }

    let variable = system.variables()[index].clone();
    match newton.on_non_convergence {
        NonConvergencePolicy::Accept => Ok(()),
        NonConvergencePolicy::Warn => {
            log::warn!(
                "Newton correction for '{variable}' stopped after {} iterations at t = {t}",
                newton.max_iterations
            );
            Ok(())
        }
        NonConvergencePolicy::Fail => Err(SolverError::NewtonDidNotConverge {
            variable,
            iterations: newton.max_iterations,
            independent: t,
        }),
    }
}
