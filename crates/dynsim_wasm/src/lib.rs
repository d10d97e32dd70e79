//! Browser bindings for the dynamic system modeler.
//!
//! `Simulation` and the expression helpers are plain Rust so they can be
//! tested natively; the `#[wasm_bindgen]` items only convert arguments and
//! errors at the JS boundary.

mod expressions;
mod logger;
mod simulation;
mod system;

pub use expressions::{
    describe_solvers, differentiate_expression, differentiate_source, evaluate_expression,
    evaluate_source, format_expression, format_source, solver_descriptions,
};
pub use simulation::{Simulation, SimulationRequest};
pub use system::WasmSimulation;
