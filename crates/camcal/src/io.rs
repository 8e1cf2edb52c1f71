//! JSON session configuration and calibration persistence.

use crate::calib::{CalibrationResult, GeometryError, PatternGeometry, SolveOptions};
use crate::capture::{CaptureConfig, ImageSequenceConnector};
use crate::chessboard::ChessboardParams;
use crate::CalibrationPipeline;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum CalibIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

fn default_min_views() -> usize {
    10
}

/// Everything a live calibration session needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Camera address handed to the connector (a directory for image sequences).
    pub camera_address: String,
    pub pattern: PatternGeometry,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub sequence: ImageSequenceConnector,
    #[serde(default = "default_min_views")]
    pub min_views: usize,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub chessboard: Option<ChessboardParams>,
    #[serde(default)]
    pub solve: Option<SolveOptions>,
}

impl SessionConfig {
    pub fn new(camera_address: impl Into<String>, pattern: PatternGeometry) -> Self {
        Self {
            camera_address: camera_address.into(),
            pattern,
            capture: CaptureConfig::default(),
            sequence: ImageSequenceConnector::default(),
            min_views: default_min_views(),
            output_path: None,
            chessboard: None,
            solve: None,
        }
    }

    /// Read a config file; the pattern geometry is validated.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibIoError> {
        let config: Self = read_json(path.as_ref())?;
        config.pattern.validate()?;
        Ok(config)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibIoError> {
        write_json(self, path.as_ref())
    }

    /// Resolve the calibration output path.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(
            self.output_path
                .as_deref()
                .unwrap_or("camcal_calibration.json"),
        )
    }

    /// Build a pipeline, applying the optional overrides.
    pub fn build_pipeline(&self) -> CalibrationPipeline {
        CalibrationPipeline::with_params(
            self.pattern,
            self.chessboard.clone().unwrap_or_default(),
            self.solve.clone().unwrap_or_default(),
        )
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CalibIoError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), CalibIoError> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Persist a calibration result as pretty-printed JSON.
pub fn save_calibration(
    result: &CalibrationResult,
    path: impl AsRef<Path>,
) -> Result<(), CalibIoError> {
    write_json(result, path.as_ref())
}

pub fn load_calibration(path: impl AsRef<Path>) -> Result<CalibrationResult, CalibIoError> {
    read_json(path.as_ref())
}
