//! Steiner angular measurements derived from cephalometric landmarks.
//!
//! Every angle is measured between two landmark-difference vectors with
//! [`angle_between`], so SNA, SNB, UI-NA and LI-NB are always acute. ANB is
//! the plain difference of SNA and SNB and may be negative.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::geometry::angle_between;
use crate::types::{Landmark, LandmarkSet, Measurement, MeasurementValues, Point};

/// Landmarks that must be placed before any measurement can be derived.
pub const REQUIRED_LANDMARKS: [Landmark; 6] = [
    Landmark::Sella,
    Landmark::Nasion,
    Landmark::PointA,
    Landmark::PointB,
    Landmark::IncisionInferius,
    Landmark::IncisionSuperius,
];

/// Vertical distance in pixels from an incisal edge to its estimated root apex.
///
/// Root apices are not among the traced landmarks, so each incisor axis is
/// approximated by a fixed vertical segment through the incisal edge.
pub const INCISOR_ROOT_OFFSET: f64 = 30.0;

/// The six Steiner angles, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SteinerMetrics {
    /// Maxilla relative to the cranial base (S-N to N-A).
    pub sna: f64,

    /// Mandible relative to the cranial base (S-N to N-B).
    pub snb: f64,

    /// Jaw discrepancy, `sna - snb`.
    pub anb: f64,

    /// Upper incisor axis to N-A.
    pub ui_na: f64,

    /// Lower incisor axis to N-B.
    pub li_nb: f64,

    /// Interincisal angle, the obtuse supplement of the angle between both incisor axes.
    pub ui_li: f64,
}

impl SteinerMetrics {
    /// Derive all measurements from a landmark set.
    ///
    /// Fails with [`Error::MissingLandmarks`] listing every unset landmark in
    /// [`REQUIRED_LANDMARKS`].
    pub fn from_landmarks(landmarks: &LandmarkSet) -> Result<Self> {
        let missing = landmarks.missing(&REQUIRED_LANDMARKS);
        if !missing.is_empty() {
            return Err(Error::MissingLandmarks { names: missing });
        }

        let point = |l: Landmark| landmarks.get(l).unwrap_or_else(Point::zero);
        let s = point(Landmark::Sella);
        let n = point(Landmark::Nasion);
        let a = point(Landmark::PointA);
        let b = point(Landmark::PointB);
        let is = point(Landmark::IncisionSuperius);
        let ii = point(Landmark::IncisionInferius);

        let sn = n - s;
        let na = a - n;
        let nb = b - n;
        let ui_axis = upper_incisor_axis(is);
        let li_axis = lower_incisor_axis(ii);

        let sna = angle_between(sn, na);
        let snb = angle_between(sn, nb);

        Ok(Self {
            sna,
            snb,
            anb: sna - snb,
            ui_na: angle_between(ui_axis, na),
            li_nb: angle_between(li_axis, nb),
            ui_li: 180.0 - angle_between(ui_axis, li_axis),
        })
    }

    pub fn get(&self, measurement: Measurement) -> f64 {
        match measurement {
            Measurement::Sna => self.sna,
            Measurement::Snb => self.snb,
            Measurement::Anb => self.anb,
            Measurement::UiNa => self.ui_na,
            Measurement::LiNb => self.li_nb,
            Measurement::UiLi => self.ui_li,
        }
    }

    /// Values in canonical measurement order.
    pub fn to_values(&self) -> MeasurementValues {
        MeasurementValues::new([
            self.sna, self.snb, self.anb, self.ui_na, self.li_nb, self.ui_li,
        ])
    }
}

/// Upper incisor axis from the estimated root apex (below the edge in image space) to the edge.
fn upper_incisor_axis(incision_superius: Point) -> Point {
    let root = Point::new(incision_superius.x, incision_superius.y + INCISOR_ROOT_OFFSET);
    incision_superius - root
}

/// Lower incisor axis from the estimated root apex (above the edge in image space) to the edge.
fn lower_incisor_axis(incision_inferius: Point) -> Point {
    let root = Point::new(incision_inferius.x, incision_inferius.y - INCISOR_ROOT_OFFSET);
    incision_inferius - root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_set() -> LandmarkSet {
        LandmarkSet::new()
            .with(Landmark::Sella, 100.0, 100.0)
            .with(Landmark::Nasion, 100.0, 50.0)
            .with(Landmark::PointA, 120.0, 90.0)
            .with(Landmark::PointB, 110.0, 130.0)
            .with(Landmark::IncisionSuperius, 125.0, 110.0)
            .with(Landmark::IncisionInferius, 122.0, 112.0)
    }

    #[test]
    fn sna_matches_reference_scenario() {
        let metrics = SteinerMetrics::from_landmarks(&complete_set()).unwrap();
        assert!((metrics.sna - 26.57).abs() < 0.01, "SNA = {}", metrics.sna);
    }

    #[test]
    fn anb_is_plain_difference() {
        let metrics = SteinerMetrics::from_landmarks(&complete_set()).unwrap();
        assert_eq!(metrics.anb, metrics.sna - metrics.snb);
    }

    #[test]
    fn anb_for_eighteen_degree_snb() {
        // N-B leans 18 degrees off the vertical S-N line.
        let dx = 80.0 * 18f64.to_radians().tan();
        let set = complete_set().with(Landmark::PointB, 100.0 + dx, 130.0);
        let metrics = SteinerMetrics::from_landmarks(&set).unwrap();

        assert!((metrics.snb - 18.0).abs() < 1e-9);
        assert_eq!(metrics.anb, metrics.sna - metrics.snb);
        assert_eq!(format!("{:.2}", metrics.anb), "8.57");
    }

    #[test]
    fn anb_can_be_negative() {
        // B further from the S-N line than A
        let set = complete_set().with(Landmark::PointB, 160.0, 130.0);
        let metrics = SteinerMetrics::from_landmarks(&set).unwrap();
        assert!(metrics.snb > metrics.sna);
        assert!(metrics.anb < 0.0);
        assert_eq!(metrics.anb, metrics.sna - metrics.snb);
    }

    #[test]
    fn vertical_incisor_axes() {
        let metrics = SteinerMetrics::from_landmarks(&complete_set()).unwrap();
        // Both synthetic axes are vertical and antiparallel.
        assert!((metrics.ui_li - 180.0).abs() < 1e-9);
        // N-A = (20, 40): angle to vertical is atan(20/40).
        let expected = (20.0f64 / 40.0).atan().to_degrees();
        assert!((metrics.ui_na - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_landmarks_are_reported_exactly() {
        let mut set = complete_set();
        set.clear(Landmark::PointB);
        set.clear(Landmark::Sella);
        // Unrelated landmarks never appear in the report.
        set.clear(Landmark::Menton);

        match SteinerMetrics::from_landmarks(&set) {
            Err(Error::MissingLandmarks { names }) => {
                assert_eq!(names, vec![Landmark::Sella, Landmark::PointB]);
            }
            other => panic!("expected MissingLandmarks, got {other:?}"),
        }
    }

    #[test]
    fn empty_set_misses_all_required() {
        match SteinerMetrics::from_landmarks(&LandmarkSet::new()) {
            Err(Error::MissingLandmarks { names }) => assert_eq!(names, REQUIRED_LANDMARKS),
            other => panic!("expected MissingLandmarks, got {other:?}"),
        }
    }

    #[test]
    fn coincident_landmarks_do_not_fail() {
        let set = complete_set().with(Landmark::Nasion, 100.0, 100.0);
        let metrics = SteinerMetrics::from_landmarks(&set).unwrap();
        // S == N gives a zero-length S-N vector.
        assert_eq!(metrics.sna, 0.0);
        assert_eq!(metrics.snb, 0.0);
        assert_eq!(metrics.anb, 0.0);
    }

    #[test]
    fn values_follow_canonical_order() {
        let metrics = SteinerMetrics::from_landmarks(&complete_set()).unwrap();
        let values = metrics.to_values();
        for m in Measurement::ALL {
            assert_eq!(values[m], metrics.get(m));
        }
    }
}
