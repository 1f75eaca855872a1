//! Calibration model configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hyperparameters for fitting the calibration regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Width of each hidden layer (default: `[100, 50]`)
    pub hidden_layers: Vec<usize>,

    /// Maximum training epochs (default: 1000)
    pub max_iter: usize,

    /// Adam step size (default: 0.001)
    pub learning_rate: f64,

    /// L2 penalty on weights (default: 0.0001)
    pub alpha: f64,

    /// Mini-batch size, capped at the number of samples (default: 200)
    pub batch_size: usize,

    /// Minimum loss improvement that counts as progress (default: 0.0001)
    pub tol: f64,

    /// Epochs without progress before training stops (default: 10)
    pub n_iter_no_change: usize,

    /// Seed for weight initialization and batch shuffling (default: 42)
    pub seed: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100, 50],
            max_iter: 1000,
            learning_rate: 1e-3,
            alpha: 1e-4,
            batch_size: 200,
            tol: 1e-4,
            n_iter_no_change: 10,
            seed: 42,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_layers.iter().any(|&w| w == 0) {
            return Err(Error::InvalidModel("hidden layer width must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidModel(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(Error::InvalidModel(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidModel("max_iter must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidModel("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}
