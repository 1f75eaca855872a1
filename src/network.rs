//! Multi-layer perceptron regressor.
//!
//! Hidden layers use ReLU and the output layer is linear. Training minimizes
//! half the mean squared error plus an L2 penalty with the Adam optimizer over
//! shuffled mini-batches.

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;
use crate::error::{Error, Result};

/// A fully connected layer: `z = x · W + b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dense {
    /// Shape `(fan_in, fan_out)`.
    weights: Array2<f64>,
    biases: Array1<f64>,
}

impl Dense {
    /// Glorot-uniform weights and biases.
    fn init(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Result<Self> {
        let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let dist =
            Uniform::new(-bound, bound).map_err(|e| Error::InvalidModel(e.to_string()))?;
        let weights = Array2::from_shape_simple_fn((fan_in, fan_out), || dist.sample(&mut *rng));
        let biases = Array1::from_shape_simple_fn(fan_out, || dist.sample(&mut *rng));
        Ok(Self { weights, biases })
    }

    fn forward(&self, x: ArrayView2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.biases
    }
}

/// Gradient of one layer's parameters.
struct DenseGrad {
    weights: Array2<f64>,
    biases: Array1<f64>,
}

/// Adam optimizer state, one moment pair per parameter tensor.
struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    beta1_t: f64,
    beta2_t: f64,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl Adam {
    fn new(layers: &[Dense], learning_rate: f64) -> Self {
        let sizes = layers
            .iter()
            .flat_map(|l| [l.weights.len(), l.biases.len()]);
        let zeros: Vec<Vec<f64>> = sizes.map(|n| vec![0.0; n]).collect();
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            beta1_t: 1.0,
            beta2_t: 1.0,
            v: zeros.clone(),
            m: zeros,
        }
    }

    /// Apply one update step to every layer.
    fn step(&mut self, layers: &mut [Dense], grads: &[DenseGrad]) {
        self.beta1_t *= self.beta1;
        self.beta2_t *= self.beta2;
        let step_size = self.learning_rate * (1.0 - self.beta2_t).sqrt() / (1.0 - self.beta1_t);

        for (i, (layer, grad)) in layers.iter_mut().zip(grads).enumerate() {
            self.update(2 * i, step_size, layer.weights.iter_mut(), grad.weights.iter());
            self.update(2 * i + 1, step_size, layer.biases.iter_mut(), grad.biases.iter());
        }
    }

    fn update<'p, 'g>(
        &mut self,
        slot: usize,
        step_size: f64,
        params: impl Iterator<Item = &'p mut f64>,
        grad: impl Iterator<Item = &'g f64>,
    ) {
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        params
            .zip(grad)
            .zip(self.m[slot].iter_mut())
            .zip(self.v[slot].iter_mut())
            .for_each(|(((p, g), m), v)| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                *p -= step_size * *m / (v.sqrt() + eps);
            });
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitReport {
    /// Epochs actually run.
    pub epochs: usize,
    /// Loss after the first epoch.
    pub initial_loss: f64,
    /// Loss after the last epoch.
    pub final_loss: f64,
    /// Whether training stopped on the tolerance criterion rather than `max_iter`.
    pub converged: bool,
}

/// A trained multi-output regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpRegressor {
    layers: Vec<Dense>,
}

impl MlpRegressor {
    /// Train a freshly initialized network on `x` (samples × features) against `y`
    /// (samples × outputs).
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        config: &CalibrationConfig,
    ) -> Result<(Self, FitReport)> {
        config.validate()?;

        let n_samples = x.nrows();
        if n_samples == 0 || y.nrows() != n_samples {
            return Err(Error::InvalidModel(format!(
                "cannot fit on {} feature rows and {} label rows",
                n_samples,
                y.nrows()
            )));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut dims = Vec::with_capacity(config.hidden_layers.len() + 2);
        dims.push(x.ncols());
        dims.extend_from_slice(&config.hidden_layers);
        dims.push(y.ncols());

        let layers = dims
            .windows(2)
            .map(|w| Dense::init(w[0], w[1], &mut rng))
            .collect::<Result<Vec<_>>>()?;

        let mut model = Self { layers };
        let mut adam = Adam::new(&model.layers, config.learning_rate);

        let batch_size = config.batch_size.min(n_samples);
        let mut indices: Vec<usize> = (0..n_samples).collect();

        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;
        let mut initial_loss = f64::NAN;
        let mut loss = f64::NAN;
        let mut converged = false;
        let mut epochs = 0;

        for epoch in 0..config.max_iter {
            indices.shuffle(&mut rng);

            let mut accumulated = 0.0;
            for batch in indices.chunks(batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                let (batch_loss, grads) = model.backprop(xb.view(), yb.view(), config.alpha);
                adam.step(&mut model.layers, &grads);
                accumulated += batch_loss * batch.len() as f64;
            }

            loss = accumulated / n_samples as f64;
            epochs = epoch + 1;
            if epoch == 0 {
                initial_loss = loss;
            }
            if !loss.is_finite() {
                return Err(Error::InvalidModel(format!(
                    "training diverged at epoch {epochs}"
                )));
            }

            if loss > best_loss - config.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            best_loss = best_loss.min(loss);

            if no_improvement > config.n_iter_no_change {
                converged = true;
                debug!("training converged after {epochs} epochs, loss={loss:.6}");
                break;
            }
        }

        if !converged {
            warn!(
                "training stopped at max_iter={} before converging, loss={loss:.6}",
                config.max_iter
            );
        }

        let report = FitReport {
            epochs,
            initial_loss,
            final_loss: loss,
            converged,
        };
        Ok((model, report))
    }

    /// Check that every layer's shape chains into the next.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::InvalidModel("regressor has no layers".into()));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.biases.len() != layer.weights.ncols() {
                return Err(Error::InvalidModel(format!(
                    "layer {i} has {} biases for {} outputs",
                    layer.biases.len(),
                    layer.weights.ncols()
                )));
            }
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].weights.ncols() != pair[1].weights.nrows() {
                return Err(Error::InvalidModel(format!(
                    "layer {i} emits {} values but layer {} takes {}",
                    pair[0].weights.ncols(),
                    i + 1,
                    pair[1].weights.nrows()
                )));
            }
        }
        Ok(())
    }

    pub fn num_inputs(&self) -> usize {
        self.layers.first().map_or(0, |l| l.weights.nrows())
    }

    pub fn num_outputs(&self) -> usize {
        self.layers.last().map_or(0, |l| l.weights.ncols())
    }

    /// Predict one output row per input row.
    pub fn predict(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let mut a = x.to_owned();
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            a = layer.forward(a.view());
            if i < last {
                a.mapv_inplace(relu);
            }
        }
        a
    }

    /// Forward and backward pass over one batch. Returns the batch loss and
    /// the gradient for every layer.
    fn backprop(&self, x: ArrayView2<f64>, y: ArrayView2<f64>, alpha: f64) -> (f64, Vec<DenseGrad>) {
        let n = x.nrows() as f64;
        let last = self.layers.len() - 1;

        // activations[i] is the input to layer i; the final entry is the output.
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.to_owned());
        for (i, layer) in self.layers.iter().enumerate() {
            let mut z = layer.forward(activations[i].view());
            if i < last {
                z.mapv_inplace(relu);
            }
            activations.push(z);
        }

        let output = &activations[self.layers.len()];
        let diff = output - &y;
        let squared = diff.mapv(|d| d * d).mean().unwrap_or_default() / 2.0;
        let penalty: f64 = self
            .layers
            .iter()
            .map(|l| l.weights.mapv(|w| w * w).sum())
            .sum();
        let loss = squared + alpha / (2.0 * n) * penalty;

        let mut grads = Vec::with_capacity(self.layers.len());
        let mut delta = diff;
        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let input = &activations[i];

            let weights = (input.t().dot(&delta) + &layer.weights * alpha) / n;
            let biases = delta.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(delta.ncols()));
            grads.push(DenseGrad { weights, biases });

            if i > 0 {
                let mut next = delta.dot(&layer.weights.t());
                // ReLU derivative, read off the post-activation input.
                next.zip_mut_with(input, |d, &a| {
                    if a <= 0.0 {
                        *d = 0.0;
                    }
                });
                delta = next;
            }
        }
        grads.reverse();

        (loss, grads)
    }
}

#[cfg(test)]
impl MlpRegressor {
    /// Build a network from raw `(weights, biases)` pairs without checking shapes.
    pub(crate) fn from_parts(layers: Vec<(Array2<f64>, Array1<f64>)>) -> Self {
        Self {
            layers: layers
                .into_iter()
                .map(|(weights, biases)| Dense { weights, biases })
                .collect(),
        }
    }
}

fn relu(z: f64) -> f64 {
    z.max(0.0)
}
