//! CLI application for Steiner cephalometric analysis.
//!
//! Usage:
//!   steiner-ceph analyze landmarks.json             # Human-readable report
//!   steiner-ceph analyze landmarks.json --json      # JSON report
//!   steiner-ceph add-example landmarks.json corrections.json
//!   steiner-ceph retrain
//!   steiner-ceph status
//!   steiner-ceph check landmarks.json
//!
//! Landmark files map landmark names (e.g. "Sella (S)", "S" or "sella") to
//! `{"x": .., "y": ..}` or `null`. Correction files map measurement names to values.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::info;
use serde::{Deserialize, Serialize};
use steiner_ceph::{
    CalibrationConfig, CalibrationModel, CalibrationState, FileStore, LandmarkSet,
    MeasurementValues, Point, SteinerAnalyzer,
};

/// Clinician corrections accumulated across CLI invocations.
const CORPUS_FILE: &str = "corpus.json";

#[derive(Parser, Debug)]
#[command(name = "steiner-ceph")]
#[command(author, version, about = "Steiner cephalometric analysis", long_about = None)]
struct Args {
    /// Directory holding the calibration model and training corpus
    #[arg(long, default_value = ".")]
    model_dir: PathBuf,

    /// Calibration hyperparameters (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure and interpret a landmark set
    Analyze {
        /// Landmark file
        landmarks: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Record clinician-corrected measurements for a landmark set
    AddExample {
        /// Landmark file
        landmarks: PathBuf,

        /// Corrected measurements file
        corrections: PathBuf,
    },
    /// Retrain the calibration model on every recorded example
    Retrain,
    /// Show calibration model state
    Status,
    /// Show which landmarks are placed
    Check {
        /// Landmark file
        landmarks: PathBuf,
    },
    /// Detect landmarks automatically
    Detect,
}

#[derive(Serialize, Deserialize)]
struct CorpusEntry {
    landmarks: LandmarkSet,
    corrections: MeasurementValues,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => CalibrationConfig::default(),
    };

    let store = FileStore::in_dir(&args.model_dir);
    let mut analyzer = SteinerAnalyzer::new(CalibrationModel::open(store, config)?);

    // Replay recorded corrections so corpus-size gating matches the whole history.
    let corpus = load_corpus(&args.model_dir)?;
    for entry in &corpus {
        analyzer.add_training_example(&entry.landmarks, entry.corrections)?;
    }

    match &args.command {
        Command::Analyze {
            landmarks,
            json,
            output,
        } => {
            let landmarks = load_landmarks(landmarks)?;
            let report = analyzer.perform_analysis(&landmarks)?;

            let output_str = if *json {
                serde_json::to_string_pretty(&report)?
            } else {
                report.to_text()
            };

            if let Some(path) = output {
                fs::write(path, &output_str)?;
                info!("report written to {}", path.display());
            } else {
                println!("{}", output_str);
            }
        }
        Command::AddExample {
            landmarks,
            corrections,
        } => {
            let landmarks = load_landmarks(landmarks)?;
            let corrections = load_corrections(corrections)?;
            analyzer.add_training_example(&landmarks, corrections)?;

            let mut corpus = corpus;
            corpus.push(CorpusEntry {
                landmarks,
                corrections,
            });
            save_corpus(&args.model_dir, &corpus)?;
            println!(
                "Training example added successfully ({} total)",
                analyzer.calibration().corpus_len()
            );
        }
        Command::Retrain => {
            let summary = analyzer.retrain_model()?;
            println!("Model retrained with {} examples", summary.examples);
            if !summary.converged {
                println!(
                    "Warning: training stopped after {} epochs without converging",
                    summary.epochs
                );
            }
        }
        Command::Status => {
            let model = analyzer.calibration();
            let state = match model.state() {
                CalibrationState::Trained => "trained",
                CalibrationState::Untrained => "untrained",
            };
            println!("Model directory: {}", args.model_dir.display());
            println!("Calibration model: {}", state);
            println!("Training examples: {}", model.corpus_len());
        }
        Command::Check { landmarks } => {
            let landmarks = load_landmarks(landmarks)?;
            for (landmark, placed) in landmarks.status() {
                let mark = if placed { "✓" } else { "✗" };
                println!("{}: {}", landmark.name(), mark);
            }
        }
        Command::Detect => {
            analyzer.detect_landmarks()?;
        }
    }

    Ok(())
}

fn load_landmarks(path: &Path) -> Result<LandmarkSet, Box<dyn std::error::Error>> {
    let named: BTreeMap<String, Option<Point>> = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(LandmarkSet::from_named(named)?)
}

fn load_corrections(path: &Path) -> Result<MeasurementValues, Box<dyn std::error::Error>> {
    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(path)?)?;
    let text: BTreeMap<String, String> = raw
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (name, value)
        })
        .collect();
    Ok(MeasurementValues::parse_corrections(&text)?)
}

fn load_corpus(dir: &Path) -> Result<Vec<CorpusEntry>, Box<dyn std::error::Error>> {
    let path = dir.join(CORPUS_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn save_corpus(dir: &Path, corpus: &[CorpusEntry]) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(dir.join(CORPUS_FILE), serde_json::to_string_pretty(corpus)?)?;
    Ok(())
}
