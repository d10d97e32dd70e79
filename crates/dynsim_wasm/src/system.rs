//! WASM wrapper around a running simulation.

use crate::simulation::{Simulation, SimulationRequest};
use dynsim_core::EngineSettings;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmSimulation {
    simulation: Simulation,
}

#[wasm_bindgen]
impl WasmSimulation {
    /// Starts integrating `equations` (each `x' = ...`) from `initial_values`
    /// at `start`. `settings_val` may be `undefined` for the defaults.
    #[wasm_bindgen(constructor)]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        equations: Vec<String>,
        initial_values: Vec<f64>,
        start: f64,
        solver_name: &str,
        step_size: f64,
        stages: u32,
        settings_val: JsValue,
    ) -> Result<WasmSimulation, JsValue> {
        console_error_panic_hook::set_once();

        let settings: EngineSettings = if settings_val.is_undefined() || settings_val.is_null() {
            EngineSettings::default()
        } else {
            from_value(settings_val)
                .map_err(|e| JsValue::from_str(&format!("Invalid engine settings: {}", e)))?
        };

        let request = SimulationRequest {
            equations,
            initial_values,
            start,
            solver: solver_name.to_string(),
            step_size,
            stages: stages as usize,
        };
        let simulation = Simulation::new(&request, &settings)
            .map_err(|e| JsValue::from_str(&format!("{e:#}")))?;
        Ok(WasmSimulation { simulation })
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.simulation.variables().to_vec()
    }

    pub fn solver_name(&self) -> String {
        self.simulation.solver_name().to_string()
    }

    pub fn is_done(&self) -> bool {
        self.simulation.is_done()
    }

    /// Pulls the next `count` states and returns them as an array of
    /// `{ independent, names, values }` objects.
    pub fn advance(&mut self, count: u32) -> Result<JsValue, JsValue> {
        let states = self
            .simulation
            .advance(count as usize)
            .map_err(|e| JsValue::from_str(&format!("{e:#}")))?;
        to_value(&states).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::WasmSimulation;
    use wasm_bindgen::JsValue;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn advances_from_js_arguments() {
        let mut sim = WasmSimulation::new(
            vec!["x' = -x".to_string()],
            vec![1.0],
            0.0,
            "rk4",
            0.1,
            1,
            JsValue::UNDEFINED,
        )
        .expect("simulation should start");
        assert_eq!(sim.variable_names(), vec!["x".to_string()]);
        let states = sim.advance(5).expect("states");
        assert!(js_sys::Array::is_array(&states));
        assert_eq!(js_sys::Array::from(&states).length(), 5);
    }

    #[wasm_bindgen_test]
    fn rejects_unknown_solvers() {
        let message = WasmSimulation::new(
            vec!["x' = -x".to_string()],
            vec![1.0],
            0.0,
            "dopri",
            0.1,
            1,
            JsValue::UNDEFINED,
        )
        .err()
        .and_then(|err| err.as_string())
        .unwrap_or_default();
        assert!(message.contains("Unknown solver"));
    }
}
