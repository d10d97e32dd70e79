//! The `dynsim_core` crate is the mathematical engine behind the dynamic
//! system modeler.
//!
//! Key components:
//! - **Expressions**: lexer, recursive-descent parser and an immutable AST
//!   with a round-tripping printer.
//! - **Derivation**: closed-form symbolic differentiation of the AST.
//! - **Equation Engine**: callable functions over the ordered free variables
//!   of an expression, either tree-walking or compiled to bytecode.
//! - **Solvers**: fixed-step ODE integrators producing lazy state streams,
//!   plus a Richardson extrapolation wrapper that raises any solver's order.
pub mod derivation;
pub mod equation_engine;
pub mod error;
pub mod expression;
pub mod lexer;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
pub mod numeric_derivative;
pub mod parser;
pub mod settings;
pub mod solvers;
pub mod state;
pub mod stepper;
pub mod system;
pub mod traits;

pub use derivation::{derivative, expand_derivative_markers};
pub use equation_engine::{EvaluatorKind, ExecutableFunction};
pub use error::{
    DerivationError, EvaluationError, FormatError, FunctionError, NumericError, SolverError,
    SystemError,
};
pub use expression::{Expr, Statement};
pub use parser::{parse, parse_expression};
pub use settings::{
    EngineSettings, JacobianSource, LogLevel, NewtonSettings, NonConvergencePolicy,
};
pub use solvers::{OdeSolver, SolveParameters, SolverDescription, SolverRegistry, StateStream};
pub use state::DynamicSystemState;
pub use stepper::{Step, Stepper};
pub use system::EquationSystem;
pub use traits::{DynamicalSystem, SharedSystem};
