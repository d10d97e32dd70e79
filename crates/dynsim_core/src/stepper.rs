//! Fixed-increment stepping of the independent variable.

use crate::error::SolverError;
use serde::Serialize;

/// One advance of the independent variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Step {
    pub from: f64,
    /// Absolute value reached by this step.
    pub to: f64,
    pub delta: f64,
}

/// Monotonic counter over the independent variable.
///
/// Values are computed as `start + n * increment` rather than by repeated
/// addition, so the n-th value does not depend on accumulated rounding.
#[derive(Debug, Clone)]
pub struct Stepper {
    start: f64,
    increment: f64,
    count: u64,
    current: Step,
}

impl Stepper {
    pub fn new(increment: f64, start: f64) -> Result<Self, SolverError> {
        if !(increment > 0.0) || !increment.is_finite() {
            return Err(SolverError::InvalidStep(increment));
        }
        Ok(Self {
            start,
            increment,
            count: 0,
            current: Step {
                from: start,
                to: start,
                delta: 0.0,
            },
        })
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    pub fn current(&self) -> Step {
        self.current
    }

    /// Moves forward by exactly one increment and returns the new step.
    pub fn advance(&mut self) -> Step {
        self.count += 1;
        self.current = Step {
            from: self.current.to,
            to: self.start + self.count as f64 * self.increment,
            delta: self.increment,
        };
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_a_zero_delta() {
        let stepper = Stepper::new(0.5, 3.0).expect("stepper should build");
        assert_eq!(
            stepper.current(),
            Step {
                from: 3.0,
                to: 3.0,
                delta: 0.0
            }
        );
    }

    #[test]
    fn reproduces_the_accumulation_exactly() {
        let mut stepper = Stepper::new(0.2, 1.0).expect("stepper should build");
        for n in 1..=10 {
            let step = stepper.advance();
            assert_eq!(step, stepper.current());
            assert_eq!(step.delta, 0.2);
            assert_eq!(step.to, 1.0 + n as f64 * 0.2);
        }
        assert_eq!(stepper.current().to, 1.0 + 10.0 * 0.2);
    }

    #[test]
    fn consecutive_steps_chain() {
        let mut stepper = Stepper::new(0.1, 0.0).expect("stepper should build");
        let first = stepper.advance();
        let second = stepper.advance();
        assert_eq!(second.from, first.to);
    }

    #[test]
    fn rejects_non_positive_increments() {
        for increment in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Stepper::new(increment, 0.0),
                Err(SolverError::InvalidStep(_))
            ));
        }
    }
}
