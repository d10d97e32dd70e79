//! Equation systems: one right-hand side per dependent variable plus an
//! optional Jacobian.

use crate::derivation::derivative;
use crate::equation_engine::{EvaluatorKind, ExecutableFunction};
use crate::error::SystemError;
use crate::expression::{Expr, Statement};
use crate::numeric_derivative::FiniteDifference;
use crate::parser::parse;
use crate::settings::{EngineSettings, JacobianSource};
use crate::traits::DynamicalSystem;
use std::collections::{HashMap, HashSet};

/// Where a function argument comes from when the function is evaluated
/// inside a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Independent,
    State(usize),
}

/// An executable function with its arguments resolved to state indices.
#[derive(Debug, Clone)]
struct BoundFunction {
    function: ExecutableFunction,
    slots: Vec<Slot>,
}

impl BoundFunction {
    fn bind(
        function: ExecutableFunction,
        equation: &str,
        independent: &str,
        index_of: &HashMap<&str, usize>,
    ) -> Result<Self, SystemError> {
        let slots = function
            .variables()
            .iter()
            .map(|name| {
                if let Some(&idx) = index_of.get(name.as_str()) {
                    Ok(Slot::State(idx))
                } else if name == independent {
                    Ok(Slot::Independent)
                } else {
                    Err(SystemError::UnknownVariable {
                        equation: equation.to_string(),
                        name: name.clone(),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { function, slots })
    }

    fn evaluate(&self, t: f64, x: &[f64]) -> f64 {
        self.function.evaluate_with(|k| match self.slots[k] {
            Slot::Independent => t,
            Slot::State(idx) => x[idx],
        })
    }
}

/// Ordered right-hand sides of `v' = f_v(t, x)`.
///
/// Order matters: the semi-implicit solver corrects variables one after the
/// other in this order. Every function may only reference state variables and
/// the independent variable.
#[derive(Debug, Clone)]
pub struct EquationSystem {
    independent: String,
    variables: Vec<String>,
    equations: Vec<BoundFunction>,
    jacobian: HashMap<(usize, usize), BoundFunction>,
    /// Fallback for entries missing from `jacobian`.
    numeric: Option<FiniteDifference>,
}

impl EquationSystem {
    pub fn new(
        independent: impl Into<String>,
        equations: Vec<(String, ExecutableFunction)>,
    ) -> Result<Self, SystemError> {
        let independent = independent.into();
        if equations.is_empty() {
            return Err(SystemError::Empty);
        }

        let mut seen = HashSet::new();
        for (name, _) in &equations {
            if name == &independent {
                return Err(SystemError::ShadowsIndependent(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(SystemError::DuplicateVariable(name.clone()));
            }
        }

        let variables: Vec<String> = equations.iter().map(|(name, _)| name.clone()).collect();
        let index_of: HashMap<&str, usize> = variables
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let bound = equations
            .into_iter()
            .map(|(name, function)| BoundFunction::bind(function, &name, &independent, &index_of))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            independent,
            variables,
            equations: bound,
            jacobian: HashMap::new(),
            numeric: None,
        })
    }

    /// Parses statements of the form `x' = rhs`, one per dependent variable,
    /// and attaches a Jacobian from the source named in `settings`.
    pub fn from_sources<S: AsRef<str>>(
        sources: &[S],
        settings: &EngineSettings,
    ) -> Result<Self, SystemError> {
        let mut equations = Vec::with_capacity(sources.len());
        for source in sources {
            let source = source.as_ref();
            let (name, rhs) = split_equation(source)?;
            let function = ExecutableFunction::with_evaluator(rhs, settings.evaluator)?;
            equations.push((name, function));
        }
        let system = Self::new(settings.independent_variable.clone(), equations)?;
        match settings.jacobian {
            JacobianSource::Symbolic => system.with_symbolic_jacobian(settings.evaluator),
            JacobianSource::FiniteDifference => {
                system.with_numeric_jacobian(settings.finite_difference)
            }
        }
    }

    /// Attaches explicitly supplied partial derivatives, keyed by
    /// `(equation variable, differentiation variable)`.
    pub fn with_jacobian(
        mut self,
        entries: Vec<((String, String), ExecutableFunction)>,
    ) -> Result<Self, SystemError> {
        let index_of: HashMap<&str, usize> = self
            .variables
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let mut jacobian = HashMap::with_capacity(entries.len());
        for ((row, column), function) in entries {
            let (Some(&r), Some(&c)) = (index_of.get(row.as_str()), index_of.get(column.as_str()))
            else {
                return Err(SystemError::UnknownJacobianEntry { row, column });
            };
            let label = format!("d{row}/d{column}");
            let bound = BoundFunction::bind(function, &label, &self.independent, &index_of)?;
            jacobian.insert((r, c), bound);
        }
        self.jacobian.extend(jacobian);
        Ok(self)
    }

    /// Differentiates every right-hand side with respect to every state
    /// variable and stores the results as the Jacobian.
    pub fn with_symbolic_jacobian(self, kind: EvaluatorKind) -> Result<Self, SystemError> {
        let mut entries = Vec::with_capacity(self.variables.len() * self.variables.len());
        for (row, equation) in self.variables.iter().zip(&self.equations) {
            for column in &self.variables {
                let partial = derivative(equation.function.expression(), column)?;
                let function = ExecutableFunction::with_evaluator(partial, kind)?;
                entries.push(((row.clone(), column.clone()), function));
            }
        }
        self.with_jacobian(entries)
    }

    /// Estimates every partial derivative not supplied explicitly by
    /// differencing the right-hand side along the state variable.
    pub fn with_numeric_jacobian(
        mut self,
        strategy: FiniteDifference,
    ) -> Result<Self, SystemError> {
        strategy.validate()?;
        self.numeric = Some(strategy);
        Ok(self)
    }

    pub fn independent_variable(&self) -> &str {
        &self.independent
    }

    pub fn equation(&self, variable: &str) -> Option<&ExecutableFunction> {
        self.index_of(variable).map(|i| &self.equations[i].function)
    }

    pub fn jacobian_entry(&self, row: &str, column: &str) -> Option<&ExecutableFunction> {
        let key = (self.index_of(row)?, self.index_of(column)?);
        self.jacobian.get(&key).map(|bound| &bound.function)
    }

    fn index_of(&self, variable: &str) -> Option<usize> {
        self.variables.iter().position(|name| name == variable)
    }
}

impl DynamicalSystem for EquationSystem {
    fn variables(&self) -> &[String] {
        &self.variables
    }

    fn apply_component(&self, index: usize, t: f64, x: &[f64]) -> f64 {
        self.equations[index].evaluate(t, x)
    }

    fn partial(&self, row: usize, column: usize, t: f64, x: &[f64]) -> Option<f64> {
        if let Some(bound) = self.jacobian.get(&(row, column)) {
            return Some(bound.evaluate(t, x));
        }
        let strategy = self.numeric.as_ref()?;
        let equation = &self.equations[row];
        Some(strategy.derivative(
            |value| {
                let mut shifted = x.to_vec();
                shifted[column] = value;
                equation.evaluate(t, &shifted)
            },
            x[column],
        ))
    }
}

/// Splits `x' = rhs` into the variable name and right-hand side.
fn split_equation(source: &str) -> Result<(String, Expr), SystemError> {
    let invalid = |reason: &str| SystemError::InvalidEquation {
        source_text: source.to_string(),
        reason: reason.to_string(),
    };
    let Statement::Assignment { target, value } = parse(source)? else {
        return Err(invalid("expected an equation of the form x' = expression"));
    };
    let name = match target {
        Expr::Derivative(inner) => match *inner {
            Expr::Variable(name) => name,
            _ => return Err(invalid("only first-order derivatives are supported")),
        },
        _ => return Err(invalid("left-hand side must be a derivative such as x'")),
    };
    if contains_marker(&value) {
        return Err(invalid("derivative markers are only allowed on the left-hand side"));
    }
    Ok((name, value))
}

fn contains_marker(expr: &Expr) -> bool {
    match expr {
        Expr::Number(_) | Expr::Constant(_) | Expr::Variable(_) => false,
        Expr::Derivative(_) => true,
        Expr::Neg(inner) | Expr::Call(_, inner) => contains_marker(inner),
        Expr::Binary(_, left, right) | Expr::Assign(left, right) => {
            contains_marker(left) || contains_marker(right)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn function(source: &str) -> ExecutableFunction {
        ExecutableFunction::new(parse_expression(source).expect("source should parse"))
            .expect("function should build")
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T, SystemError>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn binds_state_and_independent_variables() {
        let system = EquationSystem::new(
            "t",
            vec![
                ("x".to_string(), function("y * t")),
                ("y".to_string(), function("-x")),
            ],
        )
        .expect("system should build");
        assert_eq!(system.dimension(), 2);
        let mut out = [0.0; 2];
        system.apply(2.0, &[3.0, 5.0], &mut out);
        assert_eq!(out, [10.0, -3.0]);
        assert_eq!(system.partial(0, 0, 0.0, &[0.0, 0.0]), None);
    }

    #[test]
    fn rejects_invalid_systems() {
        assert!(matches!(
            EquationSystem::new("t", vec![]),
            Err(SystemError::Empty)
        ));
        assert_err_contains(
            EquationSystem::new(
                "t",
                vec![("x".to_string(), function("1")), ("x".to_string(), function("2"))],
            ),
            "more than one equation",
        );
        assert_err_contains(
            EquationSystem::new("t", vec![("x".to_string(), function("x + z"))]),
            "unknown variable 'z'",
        );
        assert!(matches!(
            EquationSystem::new("t", vec![("t".to_string(), function("1"))]),
            Err(SystemError::ShadowsIndependent(name)) if name == "t"
        ));
    }

    #[test]
    fn builds_from_sources_with_symbolic_jacobian() {
        let system = EquationSystem::from_sources(
            &["x' = x * y", "y' = -(x ^ 2) + sin(t)"],
            &EngineSettings::default(),
        )
        .expect("system should build");
        assert_eq!(system.variables(), ["x", "y"]);

        let x = [3.0, 2.0];
        assert_eq!(system.partial(0, 0, 0.0, &x), Some(2.0));
        assert_eq!(system.partial(0, 1, 0.0, &x), Some(3.0));
        assert_eq!(system.partial(1, 0, 0.0, &x), Some(-6.0));
        assert_eq!(system.partial(1, 1, 0.0, &x), Some(0.0));
        assert!(system.jacobian_entry("y", "x").is_some());
        assert!(system.equation("z").is_none());
    }

    #[test]
    fn finite_difference_jacobian_from_settings() {
        let settings = EngineSettings {
            jacobian: JacobianSource::FiniteDifference,
            ..EngineSettings::default()
        };
        let system =
            EquationSystem::from_sources(&["x' = x * y", "y' = -(x ^ 2) + sin(t)"], &settings)
                .expect("system should build");
        assert!(system.jacobian_entry("y", "x").is_none());

        let x = [3.0, 2.0];
        let expected = [[2.0, 3.0], [-6.0, 0.0]];
        for (row, entries) in expected.iter().enumerate() {
            for (column, &value) in entries.iter().enumerate() {
                let estimate = system.partial(row, column, 0.0, &x).expect("entry is estimated");
                assert!((estimate - value).abs() < 1e-6, "({row}, {column}): {estimate}");
            }
        }

        let bad = EngineSettings {
            finite_difference: FiniteDifference {
                increment: 0.0,
                ..FiniteDifference::default()
            },
            ..settings
        };
        assert_err_contains(
            EquationSystem::from_sources(&["x' = -x"], &bad),
            "increment must be positive",
        );
    }

    #[test]
    fn explicit_jacobian_entries_must_name_state_variables() {
        let system = EquationSystem::new("t", vec![("x".to_string(), function("-x"))])
            .expect("system should build");
        assert_err_contains(
            system.with_jacobian(vec![(("x".to_string(), "q".to_string()), function("-1"))]),
            "does not name two state variables",
        );
    }

    #[test]
    fn source_equations_must_be_first_order_assignments() {
        let settings = EngineSettings::default();
        assert_err_contains(EquationSystem::from_sources(&["x + 1"], &settings), "form x'");
        assert_err_contains(
            EquationSystem::from_sources(&["x = 1"], &settings),
            "left-hand side",
        );
        assert_err_contains(
            EquationSystem::from_sources(&["x'' = 1"], &settings),
            "first-order",
        );
        assert_err_contains(
            EquationSystem::from_sources(&["x' = y'"], &settings),
            "only allowed on the left-hand side",
        );
        assert_err_contains(
            EquationSystem::from_sources(&["x' = foo(x)"], &settings),
            "Unsupported function",
        );
        assert_err_contains(EquationSystem::from_sources(&["x' = (x"], &settings), "parenthesis");
    }
}
