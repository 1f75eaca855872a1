use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;
use crate::error::{Error, Result};
use crate::features::{feature_vector, StandardScaler, FEATURE_LEN};
use crate::network::MlpRegressor;
use crate::store::ArtifactStore;
use crate::types::{LandmarkSet, Measurement, MeasurementValues};

/// Corpus size below which the model neither predicts nor retrains.
pub const MIN_TRAINING_EXAMPLES: usize = 5;

/// One clinician correction: landmark features paired with the corrected measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    features: Vec<f64>,
    labels: MeasurementValues,
}

impl TrainingExample {
    pub fn new(landmarks: &LandmarkSet, labels: MeasurementValues) -> Self {
        Self {
            features: feature_vector(landmarks),
            labels,
        }
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn labels(&self) -> &MeasurementValues {
        &self.labels
    }
}

/// A fitted scaler and regressor that agree on the feature and output layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedArtifacts {
    scaler: StandardScaler,
    regressor: MlpRegressor,
}

impl FittedArtifacts {
    /// Pair a scaler with a regressor, checking both are internally consistent
    /// and match the landmark feature layout and the measurement outputs.
    pub fn new(scaler: StandardScaler, regressor: MlpRegressor) -> Result<Self> {
        scaler.validate()?;
        regressor.validate()?;
        if scaler.num_features() != FEATURE_LEN {
            return Err(Error::InvalidModel(format!(
                "scaler expects {} features, landmarks provide {}",
                scaler.num_features(),
                FEATURE_LEN
            )));
        }
        if regressor.num_inputs() != FEATURE_LEN || regressor.num_outputs() != Measurement::COUNT {
            return Err(Error::InvalidModel(format!(
                "regressor maps {} inputs to {} outputs, expected {} to {}",
                regressor.num_inputs(),
                regressor.num_outputs(),
                FEATURE_LEN,
                Measurement::COUNT
            )));
        }
        Ok(Self { scaler, regressor })
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn regressor(&self) -> &MlpRegressor {
        &self.regressor
    }

    fn predict(&self, features: ArrayView2<f64>) -> Array2<f64> {
        self.regressor.predict(self.scaler.transform(features).view())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalibrationState {
    /// No artifacts have been fitted or loaded.
    Untrained,
    /// Artifacts from a retrain (this session or a previous one) are available.
    Trained,
}

/// Result of a successful retrain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetrainSummary {
    /// Number of training examples the model was fitted on.
    pub examples: usize,
    pub epochs: usize,
    pub final_loss: f64,
    pub converged: bool,
}

/// Regression model that learns clinician corrections of Steiner measurements.
///
/// The model owns a growing corpus of [`TrainingExample`]s and, once
/// retrained, a fitted scaler and regressor persisted through an
/// [`ArtifactStore`]. The corpus is only changed by
/// [`add_training_example`](Self::add_training_example) and the fitted
/// artifacts only by [`retrain_model`](Self::retrain_model).
///
/// # Usage
///
/// ```ignore
/// let mut model = CalibrationModel::open(FileStore::in_dir("models"), CalibrationConfig::default())?;
/// model.add_training_example(&landmarks, corrected)?;
/// let summary = model.retrain_model()?;
/// let predicted = model.predict_measurements(&landmarks);
/// ```
#[derive(Debug)]
pub struct CalibrationModel<S: ArtifactStore> {
    config: CalibrationConfig,
    store: S,
    corpus: Vec<TrainingExample>,
    fitted: Option<FittedArtifacts>,
}

impl<S: ArtifactStore> CalibrationModel<S> {
    /// Load artifacts from `store` if it holds any; otherwise start untrained.
    ///
    /// The training corpus always starts empty.
    pub fn open(store: S, config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        let fitted = store.load()?;
        if fitted.is_some() {
            info!("loaded fitted calibration model");
        } else {
            debug!("no fitted calibration model, starting untrained");
        }
        Ok(Self {
            config,
            store,
            corpus: Vec::new(),
            fitted,
        })
    }

    pub fn state(&self) -> CalibrationState {
        if self.fitted.is_some() {
            CalibrationState::Trained
        } else {
            CalibrationState::Untrained
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn corpus_len(&self) -> usize {
        self.corpus.len()
    }

    pub fn training_examples(&self) -> &[TrainingExample] {
        &self.corpus
    }

    pub fn fitted(&self) -> Option<&FittedArtifacts> {
        self.fitted.as_ref()
    }

    /// Predict all six measurements from raw landmark coordinates.
    ///
    /// Returns `None` while the corpus holds fewer than
    /// [`MIN_TRAINING_EXAMPLES`] examples, or if nothing has been fitted.
    /// Availability follows the live corpus size, so examples added since the
    /// last retrain make predictions available from the previously fitted model.
    pub fn predict_measurements(&self, landmarks: &LandmarkSet) -> Option<MeasurementValues> {
        if self.corpus.len() < MIN_TRAINING_EXAMPLES {
            debug!(
                "prediction unavailable: {} of {} training examples",
                self.corpus.len(),
                MIN_TRAINING_EXAMPLES
            );
            return None;
        }
        let Some(fitted) = &self.fitted else {
            debug!("prediction unavailable: model has not been retrained");
            return None;
        };

        let features = Array2::from_shape_vec((1, FEATURE_LEN), feature_vector(landmarks)).ok()?;
        let output = fitted.predict(features.view());

        let mut values = MeasurementValues::default();
        for m in Measurement::ALL {
            values[m] = output[[0, m.index()]];
        }
        Some(values)
    }

    /// Append a clinician correction to the corpus. Does not retrain.
    pub fn add_training_example(
        &mut self,
        landmarks: &LandmarkSet,
        corrected: MeasurementValues,
    ) -> Result<()> {
        corrected.validate()?;
        self.corpus.push(TrainingExample::new(landmarks, corrected));
        debug!("added training example, corpus size {}", self.corpus.len());
        Ok(())
    }

    /// Refit scaler and regressor over the whole corpus and persist them.
    ///
    /// Fails with [`Error::InsufficientTrainingData`] below
    /// [`MIN_TRAINING_EXAMPLES`]. On any failure the previously fitted
    /// artifacts stay in place.
    pub fn retrain_model(&mut self) -> Result<RetrainSummary> {
        let n = self.corpus.len();
        if n < MIN_TRAINING_EXAMPLES {
            return Err(Error::InsufficientTrainingData {
                have: n,
                need: MIN_TRAINING_EXAMPLES,
            });
        }

        let mut x = Array2::zeros((n, FEATURE_LEN));
        let mut y = Array2::zeros((n, Measurement::COUNT));
        for (i, example) in self.corpus.iter().enumerate() {
            for (j, value) in example.features.iter().enumerate() {
                x[[i, j]] = *value;
            }
            for (j, value) in example.labels.as_slice().iter().enumerate() {
                y[[i, j]] = *value;
            }
        }

        let scaler = StandardScaler::fit(x.view())?;
        let scaled = scaler.transform(x.view());
        let (regressor, report) = MlpRegressor::fit(scaled.view(), y.view(), &self.config)?;
        let fitted = FittedArtifacts::new(scaler, regressor)?;

        self.store.save(&fitted)?;
        self.fitted = Some(fitted);

        info!(
            "retrained calibration model on {n} examples: {} epochs, loss={:.4}",
            report.epochs, report.final_loss
        );

        Ok(RetrainSummary {
            examples: n,
            epochs: report.epochs,
            final_loss: report.final_loss,
            converged: report.converged,
        })
    }
}
