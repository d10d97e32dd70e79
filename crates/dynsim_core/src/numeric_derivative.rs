//! Finite-difference derivatives of executable functions.

use crate::equation_engine::ExecutableFunction;
use crate::error::NumericError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceScheme {
    /// (f(x + h) - f(x - h)) / 2h
    #[default]
    Central,
    /// (f(x) - f(x - h)) / h
    Left,
    /// (f(x + h) - f(x)) / h
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiniteDifference {
    pub scheme: DifferenceScheme,
    pub increment: f64,
}

impl Default for FiniteDifference {
    fn default() -> Self {
        Self {
            scheme: DifferenceScheme::Central,
            increment: 1e-6,
        }
    }
}

impl FiniteDifference {
    pub fn new(scheme: DifferenceScheme, increment: f64) -> Result<Self, NumericError> {
        let strategy = Self { scheme, increment };
        strategy.validate()?;
        Ok(strategy)
    }

    pub fn validate(&self) -> Result<(), NumericError> {
        if !(self.increment > 0.0) || !self.increment.is_finite() {
            return Err(NumericError::InvalidIncrement(self.increment));
        }
        Ok(())
    }

    /// Derivative of a scalar function of one variable at `x`.
    pub fn derivative(&self, f: impl Fn(f64) -> f64, x: f64) -> f64 {
        let h = self.increment;
        match self.scheme {
            DifferenceScheme::Central => (f(x + h) - f(x - h)) / (2.0 * h),
            DifferenceScheme::Left => (f(x) - f(x - h)) / h,
            DifferenceScheme::Right => (f(x + h) - f(x)) / h,
        }
    }

    /// Partial derivative of `function` with respect to its `index`-th free
    /// variable at `point`.
    pub fn partial(
        &self,
        function: &ExecutableFunction,
        point: &[f64],
        index: usize,
    ) -> Result<f64, NumericError> {
        self.validate()?;
        let dimension = function.variables().len();
        if point.len() != dimension {
            return Err(NumericError::Dimension {
                expected: dimension,
                actual: point.len(),
            });
        }
        if index >= dimension {
            return Err(NumericError::Index { index, dimension });
        }
        let mut shifted = point.to_vec();
        let mut at = |x: f64| -> Result<f64, NumericError> {
            shifted[index] = x;
            Ok(function.evaluate(&shifted)?)
        };
        let x = point[index];
        let h = self.increment;
        let value = match self.scheme {
            DifferenceScheme::Central => (at(x + h)? - at(x - h)?) / (2.0 * h),
            DifferenceScheme::Left => (at(x)? - at(x - h)?) / h,
            DifferenceScheme::Right => (at(x + h)? - at(x)?) / h,
        };
        Ok(value)
    }

    pub fn gradient(
        &self,
        function: &ExecutableFunction,
        point: &[f64],
    ) -> Result<Vec<f64>, NumericError> {
        (0..function.variables().len())
            .map(|index| self.partial(function, point, index))
            .collect()
    }
}
