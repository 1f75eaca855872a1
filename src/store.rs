//! Persistence for fitted calibration artifacts.
//!
//! The scaler and the regressor are stored as two separate bincode blobs.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::Result;
use crate::features::StandardScaler;
use crate::model::FittedArtifacts;
use crate::network::MlpRegressor;

/// File name of the persisted scaler blob.
pub const SCALER_FILE: &str = "cephalometric_scaler.bin";

/// File name of the persisted regressor blob.
pub const MODEL_FILE: &str = "cephalometric_model.bin";

/// Load/save backend for fitted calibration artifacts.
///
/// Both operations treat the artifact pair as a unit.
pub trait ArtifactStore {
    /// Load previously saved artifacts, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<FittedArtifacts>>;

    /// Persist artifacts, replacing anything saved before.
    fn save(&mut self, artifacts: &FittedArtifacts) -> Result<()>;
}

/// Artifacts stored as two files in a directory.
///
/// A failed save leaves the previous pair in place. A crash between the two
/// renames can still leave a new scaler beside the old model.
#[derive(Debug, Clone)]
pub struct FileStore {
    scaler_path: PathBuf,
    model_path: PathBuf,
}

impl FileStore {
    /// Store using the standard file names inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self::with_paths(dir.join(SCALER_FILE), dir.join(MODEL_FILE))
    }

    pub fn with_paths<P: Into<PathBuf>, Q: Into<PathBuf>>(scaler_path: P, model_path: Q) -> Self {
        Self {
            scaler_path: scaler_path.into(),
            model_path: model_path.into(),
        }
    }

    pub fn scaler_path(&self) -> &Path {
        &self.scaler_path
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl ArtifactStore for FileStore {
    fn load(&self) -> Result<Option<FittedArtifacts>> {
        if !self.model_path.exists() {
            debug!("no saved model at {}", self.model_path.display());
            return Ok(None);
        }
        let scaler: StandardScaler = bincode::deserialize(&read_file(&self.scaler_path)?)?;
        let regressor: MlpRegressor = bincode::deserialize(&read_file(&self.model_path)?)?;
        FittedArtifacts::new(scaler, regressor).map(Some)
    }

    fn save(&mut self, artifacts: &FittedArtifacts) -> Result<()> {
        let scaler_bytes = bincode::serialize(artifacts.scaler())?;
        let model_bytes = bincode::serialize(artifacts.regressor())?;

        // Write both blobs beside their targets before replacing either.
        let scaler_tmp = sibling_path(&self.scaler_path, "tmp");
        let model_tmp = sibling_path(&self.model_path, "tmp");
        write_file(&scaler_tmp, &scaler_bytes)?;
        if let Err(e) = write_file(&model_tmp, &model_bytes) {
            let _ = fs::remove_file(&scaler_tmp);
            let _ = fs::remove_file(&model_tmp);
            return Err(e);
        }

        // A failed model rename restores the previous scaler from this backup.
        let scaler_backup = sibling_path(&self.scaler_path, "bak");
        let had_scaler = self.scaler_path.exists();
        if had_scaler {
            if let Err(e) = fs::copy(&self.scaler_path, &scaler_backup) {
                let _ = fs::remove_file(&scaler_tmp);
                let _ = fs::remove_file(&model_tmp);
                return Err(e.into());
            }
        }

        if let Err(e) = fs::rename(&scaler_tmp, &self.scaler_path) {
            let _ = fs::remove_file(&scaler_tmp);
            let _ = fs::remove_file(&model_tmp);
            let _ = fs::remove_file(&scaler_backup);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&model_tmp, &self.model_path) {
            warn!(
                "could not replace {}, restoring previous scaler",
                self.model_path.display()
            );
            let _ = fs::remove_file(&model_tmp);
            if had_scaler {
                let _ = fs::rename(&scaler_backup, &self.scaler_path);
            } else {
                let _ = fs::remove_file(&self.scaler_path);
            }
            return Err(e.into());
        }
        if had_scaler {
            let _ = fs::remove_file(&scaler_backup);
        }

        debug!(
            "saved calibration artifacts to {} and {}",
            self.scaler_path.display(),
            self.model_path.display()
        );
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

/// `path` with an extra extension, e.g. `model.bin` -> `model.bin.tmp`.
fn sibling_path(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Artifacts kept in memory as serialized blobs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    scaler: Option<Vec<u8>>,
    model: Option<Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_none()
    }
}

impl ArtifactStore for MemoryStore {
    fn load(&self) -> Result<Option<FittedArtifacts>> {
        let (Some(scaler), Some(model)) = (&self.scaler, &self.model) else {
            return Ok(None);
        };
        let scaler: StandardScaler = bincode::deserialize(scaler)?;
        let regressor: MlpRegressor = bincode::deserialize(model)?;
        FittedArtifacts::new(scaler, regressor).map(Some)
    }

    fn save(&mut self, artifacts: &FittedArtifacts) -> Result<()> {
        self.scaler = Some(bincode::serialize(artifacts.scaler())?);
        self.model = Some(bincode::serialize(artifacts.regressor())?);
        Ok(())
    }
}
