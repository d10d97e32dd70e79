//! Error types shared across the engine.
//!
//! Each failure class gets its own enum so callers can tell a malformed
//! expression apart from a bad binding or a solver misconfiguration.

use thiserror::Error;

/// Raised by the lexer and parser. `remaining` holds the unconsumed input
/// starting at the offending token (empty at end of input).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at '{remaining}'")]
pub struct FormatError {
    pub message: String,
    pub remaining: String,
}

impl FormatError {
    pub fn new(message: impl Into<String>, remaining: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            remaining: remaining.into(),
        }
    }
}

/// Raised when an expression cannot be turned into an executable function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunctionError {
    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),
    #[error("Derivative marker on '{0}' must be expanded before evaluation")]
    DerivativeMarker(String),
    #[error("Assignments cannot be evaluated")]
    Assignment,
    #[error("Variable '{0}' has no argument slot")]
    UnboundVariable(String),
}

/// Raised when the supplied bindings do not match a function's free variables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("Expected {expected} argument(s), got {actual}")]
    Arity { expected: usize, actual: usize },
    #[error(
        "Bindings do not match free variables (missing: [{}], unexpected: [{}])",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    Bindings {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),
    #[error("Derivative marker on '{0}' must be expanded before differentiation")]
    DerivativeMarker(String),
    #[error("Assignments cannot be differentiated")]
    Assignment,
}

/// Raised while assembling an equation system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SystemError {
    #[error("Equation system must contain at least one equation")]
    Empty,
    #[error("Variable '{0}' is defined by more than one equation")]
    DuplicateVariable(String),
    #[error("State variable '{0}' has the same name as the independent variable")]
    ShadowsIndependent(String),
    #[error("Equation for '{equation}' references unknown variable '{name}'")]
    UnknownVariable { equation: String, name: String },
    #[error("Jacobian entry ({row}, {column}) does not name two state variables")]
    UnknownJacobianEntry { row: String, column: String },
    #[error("Invalid equation '{source_text}': {reason}")]
    InvalidEquation { source_text: String, reason: String },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Function(#[from] FunctionError),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    #[error(transparent)]
    Numeric(#[from] NumericError),
}

/// Raised by steppers and solvers, either eagerly at `solve` or from a
/// running state stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("Step size must be positive and finite, got {0}")]
    InvalidStep(f64),
    #[error("Initial state does not match the system variables: {0}")]
    StateMismatch(String),
    #[error("Semi-implicit solver requires the Jacobian diagonal entry for '{0}'")]
    MissingJacobian(String),
    #[error("Invalid extrapolation stage count: {0}")]
    InvalidStages(usize),
    #[error("Invalid Butcher tableau: {0}")]
    InvalidTableau(String),
    #[error("Invalid Newton settings: {0}")]
    InvalidNewtonSettings(String),
    #[error(
        "Newton correction for '{variable}' did not converge within {iterations} iterations at t = {independent}"
    )]
    NewtonDidNotConverge {
        variable: String,
        iterations: usize,
        independent: f64,
    },
    #[error("Base solver stream ended before reaching the requested step")]
    StreamExhausted,
}

/// Raised by the finite-difference strategy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericError {
    #[error("Finite-difference increment must be positive and finite, got {0}")]
    InvalidIncrement(f64),
    #[error("Point has dimension {actual}, function expects {expected}")]
    Dimension { expected: usize, actual: usize },
    #[error("Variable index {index} out of range for {dimension} variable(s)")]
    Index { index: usize, dimension: usize },
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}
