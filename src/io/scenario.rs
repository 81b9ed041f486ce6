//! Scenario files: everything needed to construct a `ParametricModel`.
//!
//! ```json
//! {
//!   "n_params": 2,
//!   "model": "fractional",
//!   "transform": "exp",
//!   "t": [0.1, 1.0, 1.1],
//!   "data": [10.0, 0.7, 0.7],
//!   "relative_error": 0.1,
//!   "theta0": [0.0, 0.0]
//! }
//! ```
//!
//! Exactly one of `data_error` (absolute σ per point) or `relative_error`
//! (σ = relative_error · |data|) must be given.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ModelKind, TransformKind};
use crate::error::UqError;
use crate::models::ParametricModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub n_params: usize,
    pub model: ModelKind,
    #[serde(default)]
    pub transform: TransformKind,
    pub t: Vec<f64>,
    pub data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_error: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta0: Option<Vec<f64>>,
}

impl Scenario {
    /// The two-parameter fractional example: three points, 10% error bars,
    /// log-parameterized.
    pub fn reference() -> Self {
        Self {
            n_params: 2,
            model: ModelKind::Fractional,
            transform: TransformKind::Exp,
            t: vec![0.1, 1.0, 1.1],
            data: vec![10.0, 0.7, 0.7],
            data_error: None,
            relative_error: Some(0.1),
            theta0: Some(vec![0.0, 0.0]),
        }
    }

    /// Resolve the per-point standard deviations.
    pub fn resolved_error(&self) -> Result<Vec<f64>, UqError> {
        match (&self.data_error, self.relative_error) {
            (Some(err), None) => Ok(err.clone()),
            (None, Some(rel)) => Ok(self.data.iter().map(|d| rel * d.abs()).collect()),
            (Some(_), Some(_)) => Err(UqError::Config(
                "Scenario sets both data_error and relative_error.".to_string(),
            )),
            (None, None) => Err(UqError::Config(
                "Scenario needs data_error or relative_error.".to_string(),
            )),
        }
    }

    /// Initial guess: `theta0` if given, else zeros.
    pub fn initial_guess(&self) -> Vec<f64> {
        self.theta0.clone().unwrap_or_else(|| vec![0.0; self.n_params])
    }

    pub fn build_model(&self) -> Result<ParametricModel, UqError> {
        ParametricModel::new(
            self.n_params,
            self.t.clone(),
            self.data.clone(),
            self.resolved_error()?,
            self.model.build(),
            self.transform.into(),
        )
    }
}

/// Read a scenario JSON file.
pub fn read_scenario_json(path: &Path) -> Result<Scenario, UqError> {
    let file = File::open(path)
        .map_err(|e| UqError::Io(format!("Failed to open scenario '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| UqError::Config(format!("Invalid scenario JSON '{}': {e}", path.display())))
}

/// Write a scenario JSON file.
pub fn write_scenario_json(path: &Path, scenario: &Scenario) -> Result<(), UqError> {
    let file = File::create(path)
        .map_err(|e| UqError::Io(format!("Failed to create scenario '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, scenario)
        .map_err(|e| UqError::Io(format!("Failed to write scenario JSON: {e}")))
}
