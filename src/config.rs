use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::classify::{
    DEFAULT_SENSITIVITY_STEP, DEFAULT_THRESHOLD_PERCENTAGE, THRESHOLD_BAND_MAX, THRESHOLD_BAND_MIN,
};
use crate::roi::Roi;

const DEFAULT_CAMERA_URL: &str = "stub://door";
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_WARMUP_FRAMES: u32 = 10;

#[derive(Debug, Deserialize, Default)]
struct DoorwatchConfigFile {
    camera: Option<CameraConfigFile>,
    detection: Option<DetectionConfigFile>,
    history: Option<HistoryConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    roi: Option<String>,
    threshold_percentage: Option<f64>,
    sensitivity_step: Option<f64>,
    warmup_frames: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct HistoryConfigFile {
    export_path: Option<PathBuf>,
}

/// Resolved daemon configuration: file values, then environment overrides,
/// then validation.
#[derive(Debug, Clone)]
pub struct DoorwatchConfig {
    pub camera: CameraSettings,
    pub detection: DetectionSettings,
    pub history: HistorySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    /// Monitored rectangle. When absent the daemon monitors the full frame.
    pub roi: Option<Roi>,
    pub threshold_percentage: f64,
    pub sensitivity_step: f64,
    /// Frames discarded at startup while camera exposure settles.
    pub warmup_frames: u32,
}

#[derive(Debug, Clone)]
pub struct HistorySettings {
    /// Where to write the session history JSON on shutdown, if anywhere.
    pub export_path: Option<PathBuf>,
}

impl DoorwatchConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DOORWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DoorwatchConfigFile) -> Result<Self> {
        let camera = CameraSettings {
            url: file
                .camera
                .as_ref()
                .and_then(|camera| camera.url.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let roi = file
            .detection
            .as_ref()
            .and_then(|detection| detection.roi.as_deref())
            .map(Roi::parse_geometry)
            .transpose()?;
        let detection = DetectionSettings {
            roi,
            threshold_percentage: file
                .detection
                .as_ref()
                .and_then(|detection| detection.threshold_percentage)
                .unwrap_or(DEFAULT_THRESHOLD_PERCENTAGE),
            sensitivity_step: file
                .detection
                .as_ref()
                .and_then(|detection| detection.sensitivity_step)
                .unwrap_or(DEFAULT_SENSITIVITY_STEP),
            warmup_frames: file
                .detection
                .as_ref()
                .and_then(|detection| detection.warmup_frames)
                .unwrap_or(DEFAULT_WARMUP_FRAMES),
        };
        let history = HistorySettings {
            export_path: file.history.and_then(|history| history.export_path),
        };
        Ok(Self {
            camera,
            detection,
            history,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("DOORWATCH_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(geometry) = std::env::var("DOORWATCH_ROI") {
            if !geometry.trim().is_empty() {
                self.detection.roi = Some(Roi::parse_geometry(&geometry)?);
            }
        }
        if let Ok(threshold) = std::env::var("DOORWATCH_THRESHOLD") {
            let threshold: f64 = threshold
                .parse()
                .map_err(|_| anyhow!("DOORWATCH_THRESHOLD must be a number (percent)"))?;
            self.detection.threshold_percentage = threshold;
        }
        if let Ok(fps) = std::env::var("DOORWATCH_FPS") {
            let fps: u32 = fps
                .parse()
                .map_err(|_| anyhow!("DOORWATCH_FPS must be an integer frame rate"))?;
            self.camera.target_fps = fps;
        }
        if let Ok(path) = std::env::var("DOORWATCH_EXPORT_PATH") {
            if !path.trim().is_empty() {
                self.history.export_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.url.trim().is_empty() {
            return Err(anyhow!("camera url must not be empty"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be at least 1"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be at least 1"));
        }
        if !self.detection.threshold_percentage.is_finite()
            || self.detection.threshold_percentage <= 0.0
        {
            return Err(anyhow!("threshold_percentage must be a positive number"));
        }
        if !self.detection.sensitivity_step.is_finite() || self.detection.sensitivity_step <= 0.0 {
            return Err(anyhow!("sensitivity_step must be a positive number"));
        }
        if self.detection.threshold_percentage < THRESHOLD_BAND_MIN
            || self.detection.threshold_percentage > THRESHOLD_BAND_MAX
        {
            log::warn!(
                "threshold_percentage {:.2} is outside the usual {:.0}-{:.0} band",
                self.detection.threshold_percentage,
                THRESHOLD_BAND_MIN,
                THRESHOLD_BAND_MAX
            );
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DoorwatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
