use std::sync::Arc;

/// A first-order ODE system `x' = f(t, x)` over named state variables.
///
/// Indices used by every method follow the order of [`variables`].
///
/// [`variables`]: DynamicalSystem::variables
pub trait DynamicalSystem {
    /// Names of the dependent variables, in processing order.
    fn variables(&self) -> &[String];

    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize {
        self.variables().len()
    }

    /// Evaluates the right-hand side of equation `index`.
    fn apply_component(&self, index: usize, t: f64, x: &[f64]) -> f64;

    /// Evaluates the whole vector field into `out`.
    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.apply_component(i, t, x);
        }
    }

    /// Partial derivative of equation `row` with respect to variable
    /// `column`, when the system provides one.
    fn partial(&self, _row: usize, _column: usize, _t: f64, _x: &[f64]) -> Option<f64> {
        None
    }
}

/// Systems are shared between a solver stream and any extrapolation runs
/// spawned from it.
pub type SharedSystem = Arc<dyn DynamicalSystem + Send + Sync>;
