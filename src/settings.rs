use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::camera::CameraProps;
use crate::data::calibration::{Calibration, CalibrationPoint};
use crate::data::model::Spectrum;
use crate::data::sample_line::SampleLine;
use crate::error::SpectrumError;
use crate::state::ProcessingParams;

/// Environment variable overriding the settings file location.
pub const SETTINGS_PATH_ENV: &str = "RUSTY_PRISM_SETTINGS";
const DEFAULT_SETTINGS_FILE: &str = "rusty-prism-settings.json";

// ---------------------------------------------------------------------------
// Persistent snapshot of the model
// ---------------------------------------------------------------------------

/// Everything that survives a restart.
///
/// ```json
/// {
///   "selectedCameraId": 0,
///   "cameras": [
///     {
///       "id": 0,
///       "calibration": { "waveLengthPoints": [ { "ratio": 0.15, "nanoMeters": 393.0 }, … ] },
///       "properties": { "frameWidth": 1280, "frameHeight": 720, "exposure": 0.0 },
///       "sensitivityCalibration": { "beginNanoMeters": 380.0, "endNanoMeters": 780.0, "correctionFactors": [ … ] }
///     }
///   ],
///   "processing": { "sampleRowPosRatio": 0.5, "sampleRows": 10, … },
///   "lastUsedDirectories": { "Spectrum Data": "/home/me/spectra" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_camera_id: Option<u32>,
    #[serde(default)]
    pub cameras: Vec<CameraSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing: Option<ProcessingParams>,
    #[serde(default)]
    pub last_used_directories: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSettings {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<CameraProps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity_calibration: Option<SensitivityCalibrationSettings>,
}

impl CameraSettings {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            calibration: None,
            properties: None,
            sensitivity_calibration: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSettings {
    pub wave_length_points: Vec<CalibrationPoint>,
}

impl From<&Calibration> for CalibrationSettings {
    fn from(calibration: &Calibration) -> Self {
        Self {
            wave_length_points: calibration.points().to_vec(),
        }
    }
}

impl TryFrom<&CalibrationSettings> for Calibration {
    type Error = SpectrumError;

    fn try_from(settings: &CalibrationSettings) -> Result<Self, Self::Error> {
        Calibration::new(settings.wave_length_points.clone())
    }
}

/// Correction factors spread evenly from `begin_nano_meters` to
/// `end_nano_meters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityCalibrationSettings {
    pub begin_nano_meters: f64,
    pub end_nano_meters: f64,
    pub correction_factors: Vec<f64>,
}

impl From<&Spectrum> for SensitivityCalibrationSettings {
    fn from(corrections: &Spectrum) -> Self {
        Self {
            begin_nano_meters: corrections.calibration().begin_nano_meters(),
            end_nano_meters: corrections.calibration().end_nano_meters(),
            correction_factors: corrections.sample_line().values().to_vec(),
        }
    }
}

impl TryFrom<&SensitivityCalibrationSettings> for Spectrum {
    type Error = SpectrumError;

    fn try_from(settings: &SensitivityCalibrationSettings) -> Result<Self, Self::Error> {
        if settings.correction_factors.is_empty() {
            return Err(SpectrumError::NoSpectrum);
        }
        let calibration = Calibration::spanning(settings.begin_nano_meters, settings.end_nano_meters)?;
        Ok(Spectrum::new(
            SampleLine::new(settings.correction_factors.clone()),
            Arc::new(calibration),
        ))
    }
}

impl Settings {
    pub fn camera(&self, id: u32) -> Option<&CameraSettings> {
        self.cameras.iter().find(|c| c.id == id)
    }

    pub fn camera_mut(&mut self, id: u32) -> &mut CameraSettings {
        let index = match self.cameras.iter().position(|c| c.id == id) {
            Some(index) => index,
            None => {
                self.cameras.push(CameraSettings::new(id));
                self.cameras.len() - 1
            }
        };
        &mut self.cameras[index]
    }

    // -- JSON file --

    pub fn read_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing settings {}", path.display()))
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating settings directory {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("serializing settings")?;
        std::fs::write(path, text).with_context(|| format!("writing settings {}", path.display()))
    }

    /// Read settings, `None` if the file does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::read_json(path).map(Some)
    }

    /// `$RUSTY_PRISM_SETTINGS` or a file in the working directory.
    pub fn default_path() -> PathBuf {
        std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }
}
