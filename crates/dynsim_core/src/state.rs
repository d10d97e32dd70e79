use crate::error::SolverError;
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of a dynamic system at one value of the independent variable.
///
/// States are never updated in place; solvers build a fresh one per step so
/// that callers can keep any number of them around. Variable names are shared
/// between all states of one stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicSystemState {
    independent: f64,
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl DynamicSystemState {
    pub fn new<I, S>(independent: f64, values: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<f64>) = values
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self {
            independent,
            names: names.into(),
            values,
        }
    }

    pub(crate) fn from_parts(independent: f64, names: Arc<[String]>, values: Vec<f64>) -> Self {
        Self {
            independent,
            names,
            values,
        }
    }

    pub fn independent(&self) -> f64 {
        self.independent
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Values reordered to match `variables`. The state must name exactly
    /// those variables, each once.
    pub fn ordered_values(&self, variables: &[String]) -> Result<Vec<f64>, SolverError> {
        if self.names.len() != variables.len() {
            return Err(SolverError::StateMismatch(format!(
                "expected {} variable(s), got {}",
                variables.len(),
                self.names.len()
            )));
        }
        variables
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| {
                    SolverError::StateMismatch(format!("missing value for '{name}'"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_values_by_name() {
        let state = DynamicSystemState::new(0.5, [("x", 1.0), ("y", -2.0)]);
        assert_eq!(state.independent(), 0.5);
        assert_eq!(state.get("y"), Some(-2.0));
        assert_eq!(state.get("z"), None);
        let pairs: Vec<(&str, f64)> = state.iter().collect();
        assert_eq!(pairs, vec![("x", 1.0), ("y", -2.0)]);
    }

    #[test]
    fn reorders_values_to_the_system_order() {
        let state = DynamicSystemState::new(0.0, [("y", 2.0), ("x", 1.0)]);
        let order = vec!["x".to_string(), "y".to_string()];
        assert_eq!(state.ordered_values(&order), Ok(vec![1.0, 2.0]));
    }

    #[test]
    fn rejects_missing_or_extra_variables() {
        let order = vec!["x".to_string(), "y".to_string()];
        let short = DynamicSystemState::new(0.0, [("x", 1.0)]);
        assert!(short.ordered_values(&order).is_err());
        let wrong = DynamicSystemState::new(0.0, [("x", 1.0), ("z", 1.0)]);
        assert!(wrong.ordered_values(&order).is_err());
        let extra = DynamicSystemState::new(0.0, [("x", 1.0), ("y", 1.0), ("z", 1.0)]);
        assert!(extra.ordered_values(&order).is_err());
    }
}
