// src/config.rs - Startup configuration, loaded once and never mutated
use crate::calibration::Calibration;
use crate::error::{Error, Result};
use crate::landmark::USED_KEYPOINTS;
use crate::recommend::RecommendationTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub video: VideoConfig,
    pub calibration: Calibration,
    pub landmarks: LandmarkConfig,
    pub recommendations: RecommendationTable,
    pub detector: DetectorConfig,
    /// Directory holding the recommended item images.
    pub assets_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub camera_index: u32,
    /// Ask the detector for mirrored coordinates and show the frame mirrored.
    pub flip_horizontal: bool,
    /// Longest wait for one frame from the source before the cycle is skipped.
    pub capture_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    pub used: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// External landmark process; when unset a replay file must be given.
    pub command: Option<String>,
    pub args: Vec<String>,
    pub max_hands: u32,
    pub timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            calibration: Calibration::default(),
            landmarks: LandmarkConfig::default(),
            recommendations: RecommendationTable::default(),
            detector: DetectorConfig::default(),
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            camera_index: 0,
            flip_horizontal: true,
            capture_timeout_ms: 1000,
        }
    }
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            used: USED_KEYPOINTS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            max_hands: 1,
            timeout_ms: 1000,
        }
    }
}

impl VideoConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

impl DetectorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    /// `<config dir>/config.json` for this application, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "handsizer", "HandSizer")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path must exist; the default location may be absent, which means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(path)
            }
            _ => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.video.width == 0 || self.video.height == 0 {
            return Err(Error::Config("Video width and height must be greater than 0".to_string()));
        }
        if self.video.fps == 0 {
            return Err(Error::Config("Video fps must be greater than 0".to_string()));
        }
        if self.video.capture_timeout_ms == 0 {
            return Err(Error::Config("Capture timeout must be greater than 0".to_string()));
        }

        let ratios = [self.calibration.height_px_per_cm, self.calibration.width_px_per_cm];
        if ratios.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(Error::Config(
                "Calibration ratios must be finite and greater than 0".to_string(),
            ));
        }

        let table = &self.recommendations;
        if !(table.medium_from_cm.is_finite() && table.large_from_cm.is_finite()) {
            return Err(Error::Config("Recommendation thresholds must be finite".to_string()));
        }
        if table.medium_from_cm > table.large_from_cm {
            return Err(Error::Config(format!(
                "Medium threshold ({}) must not exceed large threshold ({})",
                table.medium_from_cm, table.large_from_cm
            )));
        }

        if self.landmarks.used.is_empty() {
            return Err(Error::Config("Landmark allow-list must not be empty".to_string()));
        }

        if self.detector.max_hands == 0 {
            return Err(Error::Config("Detector max_hands must be at least 1".to_string()));
        }
        if self.detector.timeout_ms == 0 {
            return Err(Error::Config("Detector timeout must be greater than 0".to_string()));
        }

        Ok(())
    }
}
