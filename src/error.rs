use thiserror::Error;

use crate::types::{Landmark, Measurement};

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Missing required landmarks: {}", join_names(.names))]
    MissingLandmarks { names: Vec<Landmark> },

    #[error("Invalid numeric value for {measurement}: {value:?}")]
    InvalidNumericInput {
        measurement: Measurement,
        value: String,
    },

    #[error("Need at least {need} training examples, have {have}")]
    InsufficientTrainingData { have: usize, need: usize },

    #[error("Unknown landmark: {0:?}")]
    UnknownLandmark(String),

    #[error("Unknown measurement: {0:?}")]
    UnknownMeasurement(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Automatic landmark detection is not available")]
    DetectionUnavailable,
}

fn join_names(names: &[Landmark]) -> String {
    names
        .iter()
        .map(|l| l.name())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
