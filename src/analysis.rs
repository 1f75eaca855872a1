//! Steiner analysis: landmark validation, measurement, interpretation and calibration.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::interpretation::{ClassificationTable, Interpretation};
use crate::metrics::SteinerMetrics;
use crate::model::{CalibrationModel, RetrainSummary};
use crate::store::ArtifactStore;
use crate::types::{LandmarkSet, Measurement, MeasurementValues};

/// One measurement in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementEntry {
    pub measurement: Measurement,
    /// Value computed from the landmarks, in degrees.
    pub value: f64,
    /// Calibration model suggestion, when the model is available.
    pub predicted: Option<f64>,
    /// Category label from the classification table, if the measurement has one.
    pub category: Option<&'static str>,
}

/// Result of [`SteinerAnalyzer::perform_analysis`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    metrics: SteinerMetrics,
    /// One entry per measurement, in canonical order.
    measurements: Vec<MeasurementEntry>,
    interpretations: Vec<Interpretation>,
    calibrated: bool,
}

impl AnalysisReport {
    pub fn metrics(&self) -> &SteinerMetrics {
        &self.metrics
    }

    /// One entry per measurement, in canonical order.
    pub fn measurements(&self) -> &[MeasurementEntry] {
        &self.measurements
    }

    pub fn interpretations(&self) -> &[Interpretation] {
        &self.interpretations
    }

    /// Whether calibration predictions are included.
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn entry(&self, measurement: Measurement) -> &MeasurementEntry {
        &self.measurements[measurement.index()]
    }

    pub fn value(&self, measurement: Measurement) -> f64 {
        self.entry(measurement).value
    }

    pub fn predicted(&self, measurement: Measurement) -> Option<f64> {
        self.entry(measurement).predicted
    }

    pub fn category(&self, measurement: Measurement) -> Option<&'static str> {
        self.entry(measurement).category
    }

    /// Plain-text report with measurements first and interpretation after.
    pub fn to_text(&self) -> String {
        let mut s = String::new();

        s.push_str("=== MEASUREMENTS ===\n\n");
        for entry in &self.measurements {
            let _ = write!(s, "{}: {:.1}°", entry.measurement, entry.value);
            if let Some(predicted) = entry.predicted {
                let _ = write!(s, " (ML suggested: {predicted:.1}°)");
            }
            s.push('\n');
        }

        s.push_str("\n=== INTERPRETATION ===\n\n");
        for interpretation in &self.interpretations {
            let _ = writeln!(s, "• {}", interpretation.description);
        }

        s
    }
}

/// Runs Steiner analyses and feeds clinician corrections to the calibration model.
pub struct SteinerAnalyzer<S: ArtifactStore> {
    calibration: CalibrationModel<S>,
    table: ClassificationTable,
}

impl<S: ArtifactStore> SteinerAnalyzer<S> {
    /// Analyzer with the standard Steiner classification table.
    pub fn new(calibration: CalibrationModel<S>) -> Self {
        Self::with_table(calibration, ClassificationTable::steiner())
    }

    pub fn with_table(calibration: CalibrationModel<S>, table: ClassificationTable) -> Self {
        Self { calibration, table }
    }

    pub fn calibration(&self) -> &CalibrationModel<S> {
        &self.calibration
    }

    pub fn table(&self) -> &ClassificationTable {
        &self.table
    }

    /// Measure, classify and (when available) calibrate a landmark set.
    ///
    /// Fails with [`Error::MissingLandmarks`] before computing anything if a
    /// required landmark is unset.
    pub fn perform_analysis(&self, landmarks: &LandmarkSet) -> Result<AnalysisReport> {
        let metrics = SteinerMetrics::from_landmarks(landmarks)?;
        let predictions = self.calibration.predict_measurements(landmarks);

        let measurements = Measurement::ALL
            .iter()
            .map(|m| {
                let value = metrics.get(*m);
                MeasurementEntry {
                    measurement: *m,
                    value,
                    predicted: predictions.map(|p| p[*m]),
                    category: self.table.classify(*m, value).map(|rule| rule.label),
                }
            })
            .collect();

        Ok(AnalysisReport {
            metrics,
            measurements,
            interpretations: self.table.interpret(&metrics),
            calibrated: predictions.is_some(),
        })
    }

    /// Record a clinician correction for later retraining.
    pub fn add_training_example(
        &mut self,
        landmarks: &LandmarkSet,
        corrected: MeasurementValues,
    ) -> Result<()> {
        self.calibration.add_training_example(landmarks, corrected)
    }

    pub fn retrain_model(&mut self) -> Result<RetrainSummary> {
        self.calibration.retrain_model()
    }

    /// Automatic landmark placement. No detector is available, so this always fails.
    pub fn detect_landmarks(&self) -> Result<LandmarkSet> {
        Err(Error::DetectionUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;
    use crate::store::MemoryStore;
    use crate::types::Landmark;

    fn analyzer() -> SteinerAnalyzer<MemoryStore> {
        let config = CalibrationConfig {
            hidden_layers: vec![8],
            max_iter: 100,
            ..CalibrationConfig::default()
        };
        SteinerAnalyzer::new(CalibrationModel::open(MemoryStore::new(), config).unwrap())
    }

    fn landmarks() -> LandmarkSet {
        LandmarkSet::new()
            .with(Landmark::Sella, 100.0, 100.0)
            .with(Landmark::Nasion, 100.0, 50.0)
            .with(Landmark::PointA, 120.0, 90.0)
            .with(Landmark::PointB, 110.0, 130.0)
            .with(Landmark::IncisionSuperius, 125.0, 110.0)
            .with(Landmark::IncisionInferius, 122.0, 112.0)
    }

    #[test]
    fn report_without_calibration() {
        let report = analyzer().perform_analysis(&landmarks()).unwrap();

        assert!(!report.is_calibrated());
        assert_eq!(report.measurements().len(), Measurement::COUNT);
        assert!((report.value(Measurement::Sna) - 26.57).abs() < 0.01);
        assert!(report.measurements().iter().all(|e| e.predicted.is_none()));
        assert_eq!(report.category(Measurement::Anb), Some("Class II"));
        assert_eq!(report.category(Measurement::UiLi), None);
        for (entry, m) in report.measurements().iter().zip(Measurement::ALL) {
            assert_eq!(entry.measurement, m);
            assert_eq!(report.entry(m), entry);
        }
    }

    #[test]
    fn missing_landmarks_abort_analysis() {
        let mut set = landmarks();
        set.clear(Landmark::IncisionInferius);
        match analyzer().perform_analysis(&set) {
            Err(Error::MissingLandmarks { names }) => {
                assert_eq!(names, vec![Landmark::IncisionInferius])
            }
            other => panic!("expected MissingLandmarks, got {other:?}"),
        }
    }

    #[test]
    fn report_includes_predictions_once_trained() {
        let mut analyzer = analyzer();
        for i in 0..5 {
            let corrected = MeasurementValues::new([82.0, 80.0, 2.0, 22.0, 25.0, 130.0 + i as f64]);
            analyzer
                .add_training_example(&landmarks(), corrected)
                .unwrap();
        }
        analyzer.retrain_model().unwrap();

        let report = analyzer.perform_analysis(&landmarks()).unwrap();
        assert!(report.is_calibrated());
        assert!(report.measurements().iter().all(|e| e.predicted.is_some()));
        // Categories always follow the computed value.
        assert_eq!(report.category(Measurement::Anb), Some("Class II"));
    }

    #[test]
    fn text_report_layout() {
        let text = analyzer().perform_analysis(&landmarks()).unwrap().to_text();
        assert!(text.starts_with("=== MEASUREMENTS ===\n\nSNA: 26.6°\n"));
        assert!(text.contains("\n=== INTERPRETATION ===\n\n• Class II skeletal pattern\n"));
        assert!(!text.contains("ML suggested"));
    }

    #[test]
    fn detection_is_unavailable() {
        assert!(matches!(
            analyzer().detect_landmarks(),
            Err(Error::DetectionUnavailable)
        ));
    }
}
