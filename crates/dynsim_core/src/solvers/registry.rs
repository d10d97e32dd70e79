use super::{
    ExplicitEuler, ExplicitMidpoint, Extrapolation, OdeSolver, RungeKutta, SemiImplicitMidpoint,
    SolverDescription,
};
use crate::settings::NewtonSettings;
use anyhow::{bail, Context, Result};
use std::sync::Arc;

/// Largest extrapolation stage count offered to users.
pub const MAX_STAGES: usize = 8;

/// Ordered collection of solvers, looked up by key or display name.
#[derive(Default)]
pub struct SolverRegistry {
    entries: Vec<(String, Arc<dyn OdeSolver>)>,
}

impl SolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in solver, in the order shown to users.
    pub fn standard(newton: NewtonSettings) -> Result<Self> {
        let semi_implicit =
            SemiImplicitMidpoint::new(newton).context("Invalid semi-implicit solver settings.")?;
        let mut registry = Self::new();
        registry.register("euler", Arc::new(ExplicitEuler));
        registry.register("midpoint", Arc::new(ExplicitMidpoint));
        registry.register("heun", Arc::new(RungeKutta::heun()));
        registry.register("kutta3", Arc::new(RungeKutta::kutta3()));
        registry.register("rk4", Arc::new(RungeKutta::classic()));
        registry.register("semi_implicit", Arc::new(semi_implicit));
        Ok(registry)
    }

    /// Adds a solver, replacing any previous entry with the same key.
    pub fn register(&mut self, key: impl Into<String>, solver: Arc<dyn OdeSolver>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = solver,
            None => self.entries.push((key, solver)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn descriptions(&self) -> Vec<SolverDescription> {
        self.entries
            .iter()
            .map(|(_, solver)| solver.description())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn OdeSolver>> {
        self.entries
            .iter()
            .find(|(key, solver)| key == name || solver.description().name == name)
            .map(|(_, solver)| Arc::clone(solver))
    }

    /// The named solver, wrapped in extrapolation when `stages > 1`.
    pub fn build(&self, name: &str, stages: usize) -> Result<Arc<dyn OdeSolver>> {
        if stages == 0 || stages > MAX_STAGES {
            bail!("Extrapolation stages must be between 1 and {MAX_STAGES}, got {stages}.");
        }
        let Some(base) = self.get(name) else {
            let known: Vec<&str> = self.keys().collect();
            bail!("Unknown solver '{name}'. Available: {}.", known.join(", "));
        };
        if stages == 1 {
            return Ok(base);
        }
        log::debug!("Wrapping '{name}' in {stages}-stage extrapolation");
        Ok(Arc::new(Extrapolation::new(base, stages)?))
    }
}
