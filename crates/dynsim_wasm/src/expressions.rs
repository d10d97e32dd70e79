//! Expression utilities exposed to the editor: pretty-printing, symbolic
//! derivatives and one-off evaluation.

use anyhow::{bail, Context, Result};
use dynsim_core::{
    derivative, expand_derivative_markers, parse, parse_expression, ExecutableFunction,
    NewtonSettings, SolverDescription, SolverRegistry,
};
use serde_wasm_bindgen::to_value;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

fn js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

pub fn describe_solvers() -> Result<Vec<SolverDescription>> {
    Ok(SolverRegistry::standard(NewtonSettings::default())?.descriptions())
}

/// Canonical textual form of a statement.
pub fn format_source(source: &str) -> Result<String> {
    Ok(parse(source)?.to_string())
}

/// Unsimplified derivative of `source` with respect to `variable`. Markers
/// such as `y'` are read as derivatives with respect to the same variable.
pub fn differentiate_source(source: &str, variable: &str) -> Result<String> {
    let expr = parse_expression(source)?;
    let expanded = expand_derivative_markers(&expr, variable)?;
    Ok(derivative(&expanded, variable)?.to_string())
}

pub fn evaluate_source(source: &str, names: &[String], values: &[f64]) -> Result<f64> {
    if names.len() != values.len() {
        bail!(
            "Got {} variable name(s) but {} value(s).",
            names.len(),
            values.len()
        );
    }
    let function = ExecutableFunction::new(parse_expression(source)?)
        .with_context(|| format!("Cannot evaluate '{source}'."))?;
    let bindings: HashMap<String, f64> = names.iter().cloned().zip(values.iter().copied()).collect();
    Ok(function.evaluate_named(&bindings)?)
}

/// Name, order and symmetry of every built-in solver.
#[wasm_bindgen]
pub fn solver_descriptions() -> Result<JsValue, JsValue> {
    let descriptions = describe_solvers().map_err(js_error)?;
    to_value(&descriptions).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn format_expression(source: &str) -> Result<String, JsValue> {
    format_source(source).map_err(js_error)
}

#[wasm_bindgen]
pub fn differentiate_expression(source: &str, variable: &str) -> Result<String, JsValue> {
    differentiate_source(source, variable).map_err(js_error)
}

#[wasm_bindgen]
pub fn evaluate_expression(
    source: &str,
    names: Vec<String>,
    values: Vec<f64>,
) -> Result<f64, JsValue> {
    evaluate_source(source, &names, &values).map_err(js_error)
}
