//! Clinical interpretation of Steiner measurements.
//!
//! Classification is table-driven: each measurement owns an ordered list of
//! [`Rule`]s and the first rule whose [`Band`] contains the value wins.

use serde::Serialize;

use crate::metrics::SteinerMetrics;
use crate::types::Measurement;

/// A numeric range a measurement value can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Band {
    /// `lo <= value <= hi`
    Within(f64, f64),
    /// `value > bound`
    Above(f64),
    /// `value < bound`
    Below(f64),
}

impl Band {
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            Band::Within(lo, hi) => lo <= value && value <= hi,
            Band::Above(bound) => value > bound,
            Band::Below(bound) => value < bound,
        }
    }
}

/// One row of a classification table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub band: Band,
    /// Category label, e.g. `"Class II"`.
    pub label: &'static str,
    /// Sentence used in reports, e.g. `"Class II skeletal pattern"`.
    pub description: &'static str,
}

impl Rule {
    pub const fn new(band: Band, label: &'static str, description: &'static str) -> Self {
        Self {
            band,
            label,
            description,
        }
    }
}

/// The category assigned to one measurement value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub measurement: Measurement,
    pub value: f64,
    pub label: &'static str,
    pub description: &'static str,
}

/// Ordered classification rules per measurement.
#[derive(Debug, Clone, Default)]
pub struct ClassificationTable {
    rows: Vec<(Measurement, Vec<Rule>)>,
}

impl ClassificationTable {
    /// A table with no rules; every value is left unclassified.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Standard Steiner norms.
    pub fn steiner() -> Self {
        Self::empty()
            // Skeletal pattern
            .with_rule(
                Measurement::Anb,
                Rule::new(Band::Within(0.0, 4.0), "Class I", "Class I skeletal pattern"),
            )
            .with_rule(
                Measurement::Anb,
                Rule::new(Band::Above(4.0), "Class II", "Class II skeletal pattern"),
            )
            .with_rule(
                Measurement::Anb,
                Rule::new(Band::Below(0.0), "Class III", "Class III skeletal pattern"),
            )
            // Upper incisor inclination
            .with_rule(
                Measurement::UiNa,
                Rule::new(
                    Band::Within(18.0, 26.0),
                    "Normal",
                    "Normal upper incisor inclination",
                ),
            )
            .with_rule(
                Measurement::UiNa,
                Rule::new(Band::Above(26.0), "Proclined", "Proclined upper incisors"),
            )
            .with_rule(
                Measurement::UiNa,
                Rule::new(Band::Below(18.0), "Retroclined", "Retroclined upper incisors"),
            )
            // Lower incisor inclination
            .with_rule(
                Measurement::LiNb,
                Rule::new(
                    Band::Within(21.0, 29.0),
                    "Normal",
                    "Normal lower incisor inclination",
                ),
            )
            .with_rule(
                Measurement::LiNb,
                Rule::new(Band::Above(29.0), "Proclined", "Proclined lower incisors"),
            )
            .with_rule(
                Measurement::LiNb,
                Rule::new(Band::Below(21.0), "Retroclined", "Retroclined lower incisors"),
            )
            // Maxillary position, SNA 82° ± 2
            .with_rule(
                Measurement::Sna,
                Rule::new(
                    Band::Within(80.0, 84.0),
                    "Normal",
                    "Maxilla in normal sagittal position",
                ),
            )
            .with_rule(
                Measurement::Sna,
                Rule::new(Band::Above(84.0), "Prognathic", "Prognathic maxilla"),
            )
            .with_rule(
                Measurement::Sna,
                Rule::new(Band::Below(80.0), "Retrognathic", "Retrognathic maxilla"),
            )
            // Mandibular position, SNB 80° ± 2
            .with_rule(
                Measurement::Snb,
                Rule::new(
                    Band::Within(78.0, 82.0),
                    "Normal",
                    "Mandible in normal sagittal position",
                ),
            )
            .with_rule(
                Measurement::Snb,
                Rule::new(Band::Above(82.0), "Prognathic", "Prognathic mandible"),
            )
            .with_rule(
                Measurement::Snb,
                Rule::new(Band::Below(78.0), "Retrognathic", "Retrognathic mandible"),
            )
    }

    /// Append a rule to the end of a measurement's row, creating the row if needed.
    pub fn with_rule(mut self, measurement: Measurement, rule: Rule) -> Self {
        match self.rows.iter_mut().find(|(m, _)| *m == measurement) {
            Some((_, rules)) => rules.push(rule),
            None => self.rows.push((measurement, vec![rule])),
        }
        self
    }

    pub fn rules(&self, measurement: Measurement) -> &[Rule] {
        self.rows
            .iter()
            .find(|(m, _)| *m == measurement)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    /// First rule matching `value`. Non-finite values never match.
    pub fn classify(&self, measurement: Measurement, value: f64) -> Option<&Rule> {
        if !value.is_finite() {
            return None;
        }
        self.rules(measurement)
            .iter()
            .find(|rule| rule.band.contains(value))
    }

    /// Interpret every classified measurement, in table row order.
    pub fn interpret(&self, metrics: &SteinerMetrics) -> Vec<Interpretation> {
        self.rows
            .iter()
            .filter_map(|(m, _)| {
                let value = metrics.get(*m);
                self.classify(*m, value).map(|rule| Interpretation {
                    measurement: *m,
                    value,
                    label: rule.label,
                    description: rule.description,
                })
            })
            .collect()
    }
}
