//! # steiner-ceph
//!
//! Steiner cephalometric analysis from 2D landmark coordinates.
//!
//! This crate provides:
//! - **Measurements**: the six Steiner angles (SNA, SNB, ANB, UI-NA, LI-NB, UI-LI)
//!   derived from traced landmarks
//! - **Interpretation**: table-driven clinical categories (skeletal class,
//!   incisor inclination, jaw position)
//! - **Calibration**: a regression model that learns clinician corrections and
//!   suggests measurements alongside the computed ones
//!
//! ## Algorithm Overview
//!
//! 1. Check that S, N, A, B, II and IS are placed
//! 2. Build landmark-difference vectors (S→N, N→A, N→B and the incisor axes)
//! 3. Measure the acute angle between each pair of lines
//! 4. Classify values against the Steiner norms
//! 5. If the calibration model has enough training data and has been fitted,
//!    predict all six measurements from the raw landmark coordinates
//!
//! ## Quick Start
//!
//! ```rust
//! use steiner_ceph::{
//!     CalibrationConfig, CalibrationModel, Landmark, LandmarkSet, Measurement, MemoryStore,
//!     SteinerAnalyzer,
//! };
//!
//! let model = CalibrationModel::open(MemoryStore::new(), CalibrationConfig::default()).unwrap();
//! let analyzer = SteinerAnalyzer::new(model);
//!
//! let mut landmarks = LandmarkSet::new();
//! landmarks.set(Landmark::Sella, 100.0, 100.0);
//! landmarks.set(Landmark::Nasion, 100.0, 50.0);
//! landmarks.set(Landmark::PointA, 120.0, 90.0);
//! landmarks.set(Landmark::PointB, 110.0, 130.0);
//! landmarks.set(Landmark::IncisionSuperius, 125.0, 110.0);
//! landmarks.set(Landmark::IncisionInferius, 122.0, 112.0);
//!
//! let report = analyzer.perform_analysis(&landmarks).unwrap();
//! println!("SNA = {:.1}°", report.value(Measurement::Sna));
//! println!("{}", report.to_text());
//! ```
//!
//! ## Custom Stores
//!
//! Fitted calibration artifacts are persisted through the [`ArtifactStore`]
//! trait. [`FileStore`] keeps them as two files in a directory and
//! [`MemoryStore`] keeps them in memory.

mod analysis;
mod config;
mod error;
mod features;
pub mod geometry;
mod interpretation;
mod metrics;
mod model;
mod network;
mod store;
mod types;

pub use analysis::{AnalysisReport, MeasurementEntry, SteinerAnalyzer};
pub use config::CalibrationConfig;
pub use error::{Error, Result};
pub use features::{feature_vector, StandardScaler, FEATURE_LEN};
pub use geometry::angle_between;
pub use interpretation::{Band, ClassificationTable, Interpretation, Rule};
pub use metrics::{SteinerMetrics, INCISOR_ROOT_OFFSET, REQUIRED_LANDMARKS};
pub use model::{
    CalibrationModel, CalibrationState, FittedArtifacts, RetrainSummary, TrainingExample,
    MIN_TRAINING_EXAMPLES,
};
pub use network::{FitReport, MlpRegressor};
pub use store::{ArtifactStore, FileStore, MemoryStore, MODEL_FILE, SCALER_FILE};
pub use types::{Landmark, LandmarkSet, Measurement, MeasurementValues, Point};
