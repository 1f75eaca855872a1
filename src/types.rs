use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 2D point (or vector) in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl std::ops::Neg for Point {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// The 19 cephalometric landmarks, in canonical order.
///
/// The order is part of the calibration model's feature layout and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Landmark {
    Sella,
    Nasion,
    Orbitale,
    Porion,
    PointA,
    PointB,
    Pogonion,
    Menton,
    Gnathion,
    Gonion,
    IncisionInferius,
    IncisionSuperius,
    UpperLip,
    LowerLip,
    Subnasale,
    SoftTissuePogonion,
    PosteriorNasalSpine,
    AnteriorNasalSpine,
    Articulare,
}

impl Landmark {
    pub const COUNT: usize = 19;

    pub const ALL: [Landmark; Self::COUNT] = [
        Landmark::Sella,
        Landmark::Nasion,
        Landmark::Orbitale,
        Landmark::Porion,
        Landmark::PointA,
        Landmark::PointB,
        Landmark::Pogonion,
        Landmark::Menton,
        Landmark::Gnathion,
        Landmark::Gonion,
        Landmark::IncisionInferius,
        Landmark::IncisionSuperius,
        Landmark::UpperLip,
        Landmark::LowerLip,
        Landmark::Subnasale,
        Landmark::SoftTissuePogonion,
        Landmark::PosteriorNasalSpine,
        Landmark::AnteriorNasalSpine,
        Landmark::Articulare,
    ];

    /// Position of this landmark in the canonical order.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Clinical display name, e.g. `"Subspinale (A Point)"`.
    pub const fn name(self) -> &'static str {
        match self {
            Landmark::Sella => "Sella (S)",
            Landmark::Nasion => "Nasion (N)",
            Landmark::Orbitale => "Orbitale (Or)",
            Landmark::Porion => "Porion (Po)",
            Landmark::PointA => "Subspinale (A Point)",
            Landmark::PointB => "Supramentale (B Point)",
            Landmark::Pogonion => "Pogonion (Pg)",
            Landmark::Menton => "Menton (Me)",
            Landmark::Gnathion => "Gnathion (Gn)",
            Landmark::Gonion => "Gonion (Go)",
            Landmark::IncisionInferius => "Incision Inferius (II)",
            Landmark::IncisionSuperius => "Incision Superius (IS)",
            Landmark::UpperLip => "Upper lip",
            Landmark::LowerLip => "Lower lip",
            Landmark::Subnasale => "Subnasale (Sn)",
            Landmark::SoftTissuePogonion => "Soft tissue Pogonion (Pog')",
            Landmark::PosteriorNasalSpine => "Posterior Nasal Spine (PNS)",
            Landmark::AnteriorNasalSpine => "Anterior Nasal Spine (ANS)",
            Landmark::Articulare => "Articulare (Ar)",
        }
    }

    /// Short tracing abbreviation, e.g. `"A"` or `"PNS"`.
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Landmark::Sella => "S",
            Landmark::Nasion => "N",
            Landmark::Orbitale => "Or",
            Landmark::Porion => "Po",
            Landmark::PointA => "A",
            Landmark::PointB => "B",
            Landmark::Pogonion => "Pg",
            Landmark::Menton => "Me",
            Landmark::Gnathion => "Gn",
            Landmark::Gonion => "Go",
            Landmark::IncisionInferius => "II",
            Landmark::IncisionSuperius => "IS",
            Landmark::UpperLip => "UL",
            Landmark::LowerLip => "LL",
            Landmark::Subnasale => "Sn",
            Landmark::SoftTissuePogonion => "Pog'",
            Landmark::PosteriorNasalSpine => "PNS",
            Landmark::AnteriorNasalSpine => "ANS",
            Landmark::Articulare => "Ar",
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Landmark {
    type Err = Error;

    /// Accepts the display name, the abbreviation or the variant identifier,
    /// ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Landmark::ALL
            .iter()
            .copied()
            .find(|l| {
                l.name().eq_ignore_ascii_case(wanted)
                    || l.abbreviation().eq_ignore_ascii_case(wanted)
                    || format!("{l:?}").eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| Error::UnknownLandmark(s.to_string()))
    }
}

/// Coordinates for every canonical landmark, each either placed or unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: [Option<Point>; Landmark::COUNT],
}

impl LandmarkSet {
    /// An empty set with no landmarks placed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(name, point)` pairs. `None` points leave the landmark unset.
    pub fn from_named<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Option<Point>)>,
        K: AsRef<str>,
    {
        let mut set = Self::new();
        for (name, point) in entries {
            let landmark: Landmark = name.as_ref().parse()?;
            set.points[landmark.index()] = point;
        }
        Ok(set)
    }

    /// Place a landmark at the given pixel coordinates.
    pub fn set(&mut self, landmark: Landmark, x: f64, y: f64) {
        self.points[landmark.index()] = Some(Point::new(x, y));
    }

    pub fn with(mut self, landmark: Landmark, x: f64, y: f64) -> Self {
        self.set(landmark, x, y);
        self
    }

    pub fn clear(&mut self, landmark: Landmark) {
        self.points[landmark.index()] = None;
    }

    pub fn clear_all(&mut self) {
        self.points = [None; Landmark::COUNT];
    }

    pub fn get(&self, landmark: Landmark) -> Option<Point> {
        self.points[landmark.index()]
    }

    pub fn is_set(&self, landmark: Landmark) -> bool {
        self.points[landmark.index()].is_some()
    }

    pub fn num_set(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    /// The landmarks from `required` that are unset, in the order given.
    pub fn missing(&self, required: &[Landmark]) -> Vec<Landmark> {
        required
            .iter()
            .copied()
            .filter(|l| !self.is_set(*l))
            .collect()
    }

    /// Placement status of every landmark in canonical order.
    pub fn status(&self) -> impl Iterator<Item = (Landmark, bool)> + '_ {
        Landmark::ALL.iter().map(move |l| (*l, self.is_set(*l)))
    }
}

/// The six Steiner measurements, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Measurement {
    Sna,
    Snb,
    Anb,
    UiNa,
    LiNb,
    UiLi,
}

impl Measurement {
    pub const COUNT: usize = 6;

    pub const ALL: [Measurement; Self::COUNT] = [
        Measurement::Sna,
        Measurement::Snb,
        Measurement::Anb,
        Measurement::UiNa,
        Measurement::LiNb,
        Measurement::UiLi,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Measurement::Sna => "SNA",
            Measurement::Snb => "SNB",
            Measurement::Anb => "ANB",
            Measurement::UiNa => "UI_NA",
            Measurement::LiNb => "LI_NB",
            Measurement::UiLi => "UI_LI",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Measurement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_");
        Measurement::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::UnknownMeasurement(s.to_string()))
    }
}

/// One value per measurement, in canonical order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementValues([f64; Measurement::COUNT]);

impl MeasurementValues {
    pub const fn new(values: [f64; Measurement::COUNT]) -> Self {
        Self(values)
    }

    /// Build from a name→value map. Every measurement must be present and finite.
    pub fn from_map<K: AsRef<str>>(map: &BTreeMap<K, f64>) -> Result<Self> {
        let mut values = [f64::NAN; Measurement::COUNT];
        let mut seen = [false; Measurement::COUNT];
        for (name, value) in map {
            let m: Measurement = name.as_ref().parse()?;
            values[m.index()] = *value;
            seen[m.index()] = true;
        }
        for m in Measurement::ALL {
            if !seen[m.index()] {
                return Err(Error::InvalidNumericInput {
                    measurement: m,
                    value: String::new(),
                });
            }
        }
        let parsed = Self(values);
        parsed.validate()?;
        Ok(parsed)
    }

    /// Parse clinician corrections entered as text, e.g. from form fields.
    pub fn parse_corrections<K, V>(entries: &BTreeMap<K, V>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for (name, raw) in entries {
            let m: Measurement = name.as_ref().parse()?;
            let value = raw
                .as_ref()
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::InvalidNumericInput {
                    measurement: m,
                    value: raw.as_ref().to_string(),
                })?;
            map.insert(m.name(), value);
        }
        Self::from_map(&map)
    }

    /// Reject NaN and infinite values.
    pub fn validate(&self) -> Result<()> {
        for m in Measurement::ALL {
            let value = self.0[m.index()];
            if !value.is_finite() {
                return Err(Error::InvalidNumericInput {
                    measurement: m,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Measurement, f64)> + '_ {
        Measurement::ALL.iter().map(move |m| (*m, self.0[m.index()]))
    }
}

impl std::ops::Index<Measurement> for MeasurementValues {
    type Output = f64;

    fn index(&self, m: Measurement) -> &Self::Output {
        &self.0[m.index()]
    }
}

impl std::ops::IndexMut<Measurement> for MeasurementValues {
    fn index_mut(&mut self, m: Measurement) -> &mut Self::Output {
        &mut self.0[m.index()]
    }
}
