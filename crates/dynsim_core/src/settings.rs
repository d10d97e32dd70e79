//! Engine configuration.
//!
//! Settings are plain serde structs with defaults for every field, so a
//! partial TOML document or JS object only needs the keys it changes.

use crate::equation_engine::EvaluatorKind;
use crate::error::SolverError;
use crate::numeric_derivative::FiniteDifference;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What the semi-implicit corrector does when Newton iteration hits its cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonConvergencePolicy {
    /// Keep the last iterate silently.
    Accept,
    /// Keep the last iterate and log a warning.
    #[default]
    Warn,
    /// End the stream with an error.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonSettings {
    pub max_iterations: usize,
    /// Iteration stops once |increment| < step * tolerance_factor.
    pub tolerance_factor: f64,
    pub on_non_convergence: NonConvergencePolicy,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            tolerance_factor: 1e-12,
            on_non_convergence: NonConvergencePolicy::default(),
        }
    }
}

impl NewtonSettings {
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidNewtonSettings(
                "max_iterations must be greater than zero".to_string(),
            ));
        }
        if !(self.tolerance_factor > 0.0) || !self.tolerance_factor.is_finite() {
            return Err(SolverError::InvalidNewtonSettings(
                "tolerance_factor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// How `EquationSystem::from_sources` obtains Jacobian entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JacobianSource {
    /// Differentiate every right-hand side with the derivation service.
    #[default]
    Symbolic,
    /// Estimate entries on demand with the `finite_difference` settings.
    FiniteDifference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub evaluator: EvaluatorKind,
    /// Name of the independent variable right-hand sides may reference.
    pub independent_variable: String,
    pub newton: NewtonSettings,
    pub jacobian: JacobianSource,
    /// Only read when `jacobian` is `FiniteDifference`.
    pub finite_difference: FiniteDifference,
    /// Applied to the global logger when a simulation starts.
    pub log_level: LogLevel,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorKind::default(),
            independent_variable: "t".to_string(),
            newton: NewtonSettings::default(),
            jacobian: JacobianSource::default(),
            finite_difference: FiniteDifference::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: EngineSettings =
            toml::from_str(source).context("Failed to parse engine settings.")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.independent_variable.is_empty() {
            anyhow::bail!("independent_variable must not be empty.");
        }
        self.newton.validate()?;
        self.finite_difference
            .validate()
            .context("Invalid finite-difference settings.")?;
        Ok(())
    }
}
