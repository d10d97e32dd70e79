//! Explicit Runge-Kutta stepping driven by a Butcher tableau.

use super::{OdeSolver, SolveParameters, SolverDescription, StateStream, StreamStart};
use crate::error::SolverError;
use crate::state::DynamicSystemState;
use crate::traits::SharedSystem;
use nalgebra::{DMatrix, DVector};

/// Stage matrix `A` (strictly lower triangular) and weights `B`. Stage
/// nodes are the row sums of `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct ButcherTableau {
    a: DMatrix<f64>,
    b: DVector<f64>,
    c: DVector<f64>,
}

impl ButcherTableau {
    pub fn new(a: DMatrix<f64>, b: DVector<f64>) -> Result<Self, SolverError> {
        if a.nrows() == 0 || !a.is_square() {
            return Err(SolverError::InvalidTableau(format!(
                "A must be a non-empty square matrix, got {}x{}",
                a.nrows(),
                a.ncols()
            )));
        }
        if b.len() != a.nrows() {
            return Err(SolverError::InvalidTableau(format!(
                "B has {} weight(s) for {} stage(s)",
                b.len(),
                a.nrows()
            )));
        }
        for i in 0..a.nrows() {
            for j in i..a.ncols() {
                if a[(i, j)] != 0.0 {
                    return Err(SolverError::InvalidTableau(format!(
                        "A must be strictly lower triangular, found {} at ({i}, {j})",
                        a[(i, j)]
                    )));
                }
            }
        }
        Ok(Self::from_parts(a, b))
    }

    fn from_parts(a: DMatrix<f64>, b: DVector<f64>) -> Self {
        let c = DVector::from_iterator(a.nrows(), a.row_iter().map(|row| row.sum()));
        Self { a, b, c }
    }

    /// Heun's method, order 2.
    pub fn heun() -> Self {
        Self::from_parts(
            DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 0.0]),
            DVector::from_row_slice(&[0.5, 0.5]),
        )
    }

    /// Kutta's third-order method.
    pub fn kutta3() -> Self {
        #[rustfmt::skip]
        let a = DMatrix::from_row_slice(3, 3, &[
            0.0, 0.0, 0.0,
            0.5, 0.0, 0.0,
            -1.0, 2.0, 0.0,
        ]);
        Self::from_parts(a, DVector::from_row_slice(&[1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0]))
    }

    /// The classic fourth-order method.
    pub fn classic_rk4() -> Self {
        #[rustfmt::skip]
        let a = DMatrix::from_row_slice(4, 4, &[
            0.0, 0.0, 0.0, 0.0,
            0.5, 0.0, 0.0, 0.0,
            0.0, 0.5, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
        ]);
        Self::from_parts(
            a,
            DVector::from_row_slice(&[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0]),
        )
    }

    pub fn stages(&self) -> usize {
        self.b.len()
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    pub fn c(&self) -> &DVector<f64> {
        &self.c
    }
}

/// One explicit stepping engine shared by every tableau.
#[derive(Debug, Clone)]
pub struct RungeKutta {
    name: String,
    order: u32,
    tableau: ButcherTableau,
}

impl RungeKutta {
    pub fn new(name: impl Into<String>, order: u32, tableau: ButcherTableau) -> Self {
        Self {
            name: name.into(),
            order,
            tableau,
        }
    }

    pub fn heun() -> Self {
        Self::new("Heun", 2, ButcherTableau::heun())
    }

    pub fn kutta3() -> Self {
        Self::new("Kutta 3", 3, ButcherTableau::kutta3())
    }

    pub fn classic() -> Self {
        Self::new("Runge-Kutta 4", 4, ButcherTableau::classic_rk4())
    }

    pub fn tableau(&self) -> &ButcherTableau {
        &self.tableau
    }
}

impl OdeSolver for RungeKutta {
    fn description(&self) -> SolverDescription {
        SolverDescription::new(self.name.clone(), self.order, false)
    }

    fn solve(
        &self,
        system: SharedSystem,
        initial: &DynamicSystemState,
        parameters: SolveParameters,
    ) -> Result<StateStream, SolverError> {
        let mut start = StreamStart::new(system, initial, parameters)?;
        log::debug!(
            "{}: {} variable(s), {} stage(s), step {}",
            self.name,
            start.state.len(),
            self.tableau.stages(),
            parameters.step_size
        );
        let tableau = self.tableau.clone();
        let dim = start.state.len();
        let mut k = DMatrix::<f64>::zeros(dim, tableau.stages());
        let mut stage = vec![0.0; dim];
        let mut rate = vec![0.0; dim];
        Ok(Box::new(std::iter::from_fn(move || {
            let t = start.stepper.current().to;
            let step = start.stepper.advance();
            let h = step.delta;

            for i in 0..tableau.stages() {
                for (v, slot) in stage.iter_mut().enumerate() {
                    let increment: f64 = (0..i).map(|j| tableau.a[(i, j)] * k[(v, j)]).sum();
                    *slot = start.state[v] + h * increment;
                }
                start
                    .system
                    .apply(t + tableau.c[i] * h, &stage, &mut rate);
                k.set_column(i, &DVector::from_column_slice(&rate));
            }

            let update = &k * &tableau.b;
            for (x, dx) in start.state.iter_mut().zip(update.iter()) {
                *x += h * dx;
            }
            Some(Ok(start.snapshot(step.to)))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::traits::DynamicalSystem;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    /// x' = t, exact for any method with consistent nodes.
    struct Ramp {
        names: Vec<String>,
    }

    impl DynamicalSystem for Ramp {
        fn variables(&self) -> &[String] {
            &self.names
        }

        fn apply_component(&self, _index: usize, t: f64, _x: &[f64]) -> f64 {
            t
        }
    }

    #[test]
    fn tableau_validation() {
        assert_err_contains(
            ButcherTableau::new(DMatrix::zeros(2, 3), DVector::zeros(2)),
            "square",
        );
        assert_err_contains(
            ButcherTableau::new(DMatrix::zeros(2, 2), DVector::zeros(3)),
            "3 weight(s) for 2 stage(s)",
        );
        assert_err_contains(
            ButcherTableau::new(
                DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]),
                DVector::zeros(2),
            ),
            "strictly lower triangular",
        );
        let tableau = ButcherTableau::new(
            DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.5, 0.0]),
            DVector::from_row_slice(&[0.0, 1.0]),
        )
        .expect("midpoint tableau is valid");
        assert_eq!(tableau.c().as_slice(), &[0.0, 0.5]);
    }

    #[test]
    fn builtin_tableaux_are_consistent() {
        for tableau in [
            ButcherTableau::heun(),
            ButcherTableau::kutta3(),
            ButcherTableau::classic_rk4(),
        ] {
            assert_relative_eq!(tableau.b().sum(), 1.0, epsilon = 1e-15);
            let checked = ButcherTableau::new(tableau.a().clone(), tableau.b().clone())
                .expect("builtin tableau should validate");
            assert_eq!(checked, tableau);
        }
    }

    #[test]
    fn rk4_fourth_order_convergence() {
        let coarse = decay_error(&RungeKutta::classic(), 10);
        let fine = decay_error(&RungeKutta::classic(), 20);
        let ratio = coarse / fine;
        assert!((ratio - 16.0).abs() < 1.5, "ratio {ratio}");
    }

    #[test]
    fn lower_order_tableaux_converge_at_their_order() {
        let heun = decay_error(&RungeKutta::heun(), 50) / decay_error(&RungeKutta::heun(), 100);
        assert!((heun - 4.0).abs() < 0.3, "heun ratio {heun}");
        let kutta = decay_error(&RungeKutta::kutta3(), 20) / decay_error(&RungeKutta::kutta3(), 40);
        assert!((kutta - 8.0).abs() < 0.8, "kutta ratio {kutta}");
    }

    #[test]
    fn stages_see_the_shifted_independent_variable() {
        let system: SharedSystem = Arc::new(Ramp {
            names: vec!["x".to_string()],
        });
        let initial = DynamicSystemState::new(1.0, [("x", 0.0)]);
        let state = run(&RungeKutta::classic(), system, &initial, 0.25, 4);
        // x(2) = (2^2 - 1^2) / 2
        assert_relative_eq!(state.values()[0], 1.5, epsilon = 1e-12);
        assert_relative_eq!(state.independent(), 2.0);
    }
}
