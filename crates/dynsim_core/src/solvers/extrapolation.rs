//! Richardson extrapolation over any base solver.

use super::{OdeSolver, SolveParameters, SolverDescription, StateStream, StreamStart};
use crate::error::SolverError;
use crate::state::DynamicSystemState;
use crate::traits::SharedSystem;
use std::fmt;
use std::sync::Arc;

/// Wraps a base solver and, for every output step Δ, runs it `stages` times
/// from the same state with steps `Δ / c_i`, then combines the results in a
/// Neville table.
///
/// `c_i` is `1, 2, …, k` in general and `2, 4, …, 2k` for symmetric bases,
/// whose error expansion only has even powers of the step.
#[derive(Clone)]
pub struct Extrapolation {
    base: Arc<dyn OdeSolver>,
    coefficients: Vec<usize>,
}

impl Extrapolation {
    pub fn new(base: Arc<dyn OdeSolver>, stages: usize) -> Result<Self, SolverError> {
        if stages == 0 {
            return Err(SolverError::InvalidStages(stages));
        }
        let factor = if base.description().symmetric { 2 } else { 1 };
        let coefficients = (1..=stages).map(|i| factor * i).collect();
        Ok(Self { base, coefficients })
    }

    pub fn stages(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[usize] {
        &self.coefficients
    }
}

impl fmt::Debug for Extrapolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extrapolation")
            .field("base", &self.base.description().name)
            .field("coefficients", &self.coefficients)
            .finish()
    }
}

impl OdeSolver for Extrapolation {
    fn description(&self) -> SolverDescription {
        let base = self.base.description();
        let gain = if base.symmetric { 2 } else { 1 };
        let stages = self.stages();
        SolverDescription::new(
            format!("{} ({stages} stages)", base.name),
            base.order + (stages as u32 - 1) * gain,
            false,
        )
    }

    fn solve(
        &self,
        system: SharedSystem,
        initial: &DynamicSystemState,
        parameters: SolveParameters,
    ) -> Result<StateStream, SolverError> {
        let mut start = StreamStart::new(Arc::clone(&system), initial, parameters)?;
        // Surface base-solver argument errors now rather than on the first pull.
        self.base.solve(system, initial, parameters)?;
        log::debug!(
            "Extrapolating {} with coefficients {:?}, step {}",
            self.base.description().name,
            self.coefficients,
            parameters.step_size
        );

        let base = Arc::clone(&self.base);
        let coefficients = self.coefficients.clone();
        let exponent = base.description().order as i32;
        let mut current = start.snapshot(initial.independent());
        let mut failed = false;
        Ok(Box::new(std::iter::from_fn(move || {
            if failed {
                return None;
            }
            let step = start.stepper.advance();
            let table = match refine(&*base, &start.system, &current, step.delta, &coefficients) {
                Ok(table) => table,
                Err(err) => {
                    failed = true;
                    return Some(Err(err));
                }
            };
            for (v, value) in start.state.iter_mut().enumerate() {
                let mut column: Vec<f64> = table.iter().map(|row| row[v]).collect();
                *value = neville(&mut column, &coefficients, exponent);
            }
            current = start.snapshot(step.to);
            Some(Ok(current.clone()))
        })))
    }
}

/// Runs the base solver once per coefficient and returns the final values of
/// each run.
fn refine(
    base: &dyn OdeSolver,
    system: &SharedSystem,
    from: &DynamicSystemState,
    delta: f64,
    coefficients: &[usize],
) -> Result<Vec<Vec<f64>>, SolverError> {
    coefficients
        .iter()
        .map(|&c| {
            let parameters = SolveParameters::new(delta / c as f64);
            let mut last = None;
            for item in base.solve(Arc::clone(system), from, parameters)?.take(c) {
                last = Some(item?);
            }
            let state = last.ok_or(SolverError::StreamExhausted)?;
            Ok(state.values().to_vec())
        })
        .collect()
}

/// Extrapolates `values[i]`, computed with `coefficients[i]` micro-steps, to
/// a zero step. Overwrites `values` with the table's last diagonal.
fn neville(values: &mut [f64], coefficients: &[usize], exponent: i32) -> f64 {
    let k = values.len();
    for j in 1..k {
        for i in (j..k).rev() {
            let ratio = (coefficients[i] as f64 / coefficients[i - j] as f64).powi(exponent);
            values[i] += (values[i] - values[i - 1]) / (ratio - 1.0);
        }
    }
    values[k - 1]
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{ExplicitEuler, ExplicitMidpoint, SemiImplicitMidpoint};
    use super::*;
    use crate::settings::{NewtonSettings, NonConvergencePolicy};
    use approx::assert_relative_eq;

    fn extrapolated(base: Arc<dyn OdeSolver>, stages: usize) -> Extrapolation {
        Extrapolation::new(base, stages).expect("stage count is valid")
    }

    #[test]
    fn coefficients_follow_symmetry() {
        let euler = extrapolated(Arc::new(ExplicitEuler), 3);
        assert_eq!(euler.coefficients(), &[1, 2, 3]);
        let midpoint = extrapolated(Arc::new(ExplicitMidpoint), 3);
        assert_eq!(midpoint.coefficients(), &[2, 4, 6]);
        assert!(matches!(
            Extrapolation::new(Arc::new(ExplicitEuler), 0),
            Err(SolverError::InvalidStages(0))
        ));
    }

    #[test]
    fn declared_order_grows_with_stages() {
        let euler = extrapolated(Arc::new(ExplicitEuler), 3).description();
        assert_eq!(euler.order, 3);
        assert!(!euler.symmetric);
        assert_eq!(euler.name, "Explicit Euler (3 stages)");
        let midpoint = extrapolated(Arc::new(ExplicitMidpoint), 4).description();
        assert_eq!(midpoint.order, 8);
    }

    #[test]
    fn neville_table_is_exact_for_linear_error() {
        // y(h) = 1 + 3h with h = 1/c
        let coefficients = [1, 2, 3];
        let mut values: Vec<f64> = coefficients.iter().map(|&c| 1.0 + 3.0 / c as f64).collect();
        assert_relative_eq!(neville(&mut values, &coefficients, 1), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn single_stage_reproduces_the_base_solver() {
        let wrapped = extrapolated(Arc::new(ExplicitEuler), 1);
        let direct = run(&ExplicitEuler, Decay::shared(-1.0), &unit_state(), 0.1, 4);
        let state = run(&wrapped, Decay::shared(-1.0), &unit_state(), 0.1, 4);
        assert_relative_eq!(state.values()[0], direct.values()[0], epsilon = 1e-15);
        assert_relative_eq!(state.independent(), direct.independent());
    }

    #[test]
    fn extrapolated_euler_gains_one_order_per_stage() {
        let two = extrapolated(Arc::new(ExplicitEuler), 2);
        let ratio = decay_error(&two, 20) / decay_error(&two, 40);
        assert!((ratio - 4.0).abs() < 0.5, "k = 2 ratio {ratio}");

        let three = extrapolated(Arc::new(ExplicitEuler), 3);
        let ratio = decay_error(&three, 10) / decay_error(&three, 20);
        assert!((ratio - 8.0).abs() < 1.5, "k = 3 ratio {ratio}");
    }

    #[test]
    fn extrapolated_midpoint_gains_two_orders_per_stage() {
        let two = extrapolated(Arc::new(ExplicitMidpoint), 2);
        let ratio = decay_error(&two, 10) / decay_error(&two, 20);
        assert!((ratio - 16.0).abs() < 3.0, "k = 2 ratio {ratio}");
    }

    #[test]
    fn base_failures_end_the_outer_stream() {
        let newton = NewtonSettings {
            max_iterations: 1,
            on_non_convergence: NonConvergencePolicy::Fail,
            ..NewtonSettings::default()
        };
        let base = SemiImplicitMidpoint::new(newton).expect("settings are valid");
        let wrapped = extrapolated(Arc::new(base), 2);
        let mut stream = wrapped
            .solve(Decay::shared(-1.0), &unit_state(), SolveParameters::new(0.1))
            .expect("solve should start");
        assert!(matches!(
            stream.next(),
            Some(Err(SolverError::NewtonDidNotConverge { .. }))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn newton_failure_reaches_the_caller_with_its_variable() {
        let newton = NewtonSettings {
            max_iterations: 1,
            on_non_convergence: NonConvergencePolicy::Fail,
            ..NewtonSettings::default()
        };
        let base = SemiImplicitMidpoint::new(newton).expect("settings are valid");
        let wrapped = extrapolated(Arc::new(base), 3);
        assert_eq!(wrapped.coefficients(), &[2, 4, 6]);
        // x starts on its fixed point (y = 0), so only y fails to converge.
        let initial = DynamicSystemState::new(0.0, [("x", 1.0), ("y", 0.0)]);
        let first = wrapped
            .solve(Oscillator::shared(), &initial, SolveParameters::new(0.1))
            .expect("solve should start")
            .next();
        match first {
            Some(Err(SolverError::NewtonDidNotConverge { variable, .. })) => {
                assert_eq!(variable, "y")
            }
            other => panic!("expected a Newton failure, got {other:?}"),
        }
    }

    #[test]
    fn argument_errors_surface_at_solve() {
        let wrapped = extrapolated(Arc::new(ExplicitEuler), 2);
        assert_err_contains(
            wrapped.solve(Decay::shared(-1.0), &unit_state(), SolveParameters::new(-1.0)),
            "Step size must be positive",
        );
    }
}
