use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Landmark, LandmarkSet};

/// Length of a landmark feature vector: `x, y` for every canonical landmark.
pub const FEATURE_LEN: usize = 2 * Landmark::COUNT;

/// Flatten a landmark set to `[x0, y0, x1, y1, ...]` in canonical landmark order.
///
/// Unset landmarks contribute `0.0, 0.0`.
pub fn feature_vector(landmarks: &LandmarkSet) -> Vec<f64> {
    let mut v = Vec::with_capacity(FEATURE_LEN);
    for landmark in Landmark::ALL {
        match landmarks.get(landmark) {
            Some(p) => {
                v.push(p.x);
                v.push(p.y);
            }
            None => {
                v.push(0.0);
                v.push(0.0);
            }
        }
    }
    v
}

/// Per-feature standardization to zero mean and unit variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation over the rows of `x`.
    ///
    /// Constant features get a scale of 1 so they map to 0 instead of NaN.
    pub fn fit(x: ArrayView2<f64>) -> Result<Self> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::InvalidModel("cannot fit scaler on zero samples".into()))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        Ok(Self { mean, scale })
    }

    /// Check that mean and scale cover the same features and every scale is usable.
    pub fn validate(&self) -> Result<()> {
        if self.scale.len() != self.mean.len() {
            return Err(Error::InvalidModel(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(Error::InvalidModel("scaler has a non-positive scale".into()));
        }
        Ok(())
    }

    pub fn num_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    pub fn scale(&self) -> ArrayView1<'_, f64> {
        self.scale.view()
    }

    /// Standardize every row of `x`.
    pub fn transform(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let mut out = x.to_owned();
        out -= &self.mean;
        out /= &self.scale;
        out
    }
}

#[cfg(test)]
impl StandardScaler {
    /// Build a scaler from raw statistics without checking them.
    pub(crate) fn from_parts(mean: Array1<f64>, scale: Array1<f64>) -> Self {
        Self { mean, scale }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn feature_vector_layout() {
        let set = LandmarkSet::new()
            .with(Landmark::Sella, 10.0, 20.0)
            .with(Landmark::Articulare, 7.0, 9.0);
        let v = feature_vector(&set);

        assert_eq!(v.len(), FEATURE_LEN);
        assert_eq!(&v[0..2], &[10.0, 20.0]);
        // Nasion unset
        assert_eq!(&v[2..4], &[0.0, 0.0]);
        assert_eq!(&v[36..38], &[7.0, 9.0]);
    }

    #[test]
    fn empty_set_is_all_zeros() {
        assert!(feature_vector(&LandmarkSet::new()).iter().all(|x| *x == 0.0));
    }

    #[test]
    fn scaler_standardizes_columns() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();

        assert_eq!(scaler.num_features(), 2);
        assert!((scaler.mean()[0] - 3.0).abs() < 1e-12);
        // Constant column keeps unit scale.
        assert_eq!(scaler.scale()[1], 1.0);

        let t = scaler.transform(x.view());
        let col0 = t.column(0);
        assert!(col0.mean().unwrap().abs() < 1e-12);
        assert!((col0.std(0.0) - 1.0).abs() < 1e-12);
        assert!(t.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn validate_checks_statistics() {
        let fitted = StandardScaler::fit(array![[1.0, 2.0], [3.0, 5.0]].view()).unwrap();
        assert!(fitted.validate().is_ok());

        let uneven = StandardScaler::from_parts(Array1::zeros(3), Array1::ones(2));
        assert!(matches!(uneven.validate(), Err(Error::InvalidModel(_))));

        let zero_scale = StandardScaler::from_parts(Array1::zeros(2), array![1.0, 0.0]);
        assert!(zero_scale.validate().is_err());
    }

    #[test]
    fn scaler_rejects_empty_input() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::fit(x.view()).is_err());
    }
}
