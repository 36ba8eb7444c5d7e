//! doorwatch
//!
//! This crate watches one door. It classifies a monitored rectangle of a
//! video stream as OPEN or CLOSED by differencing frames against a
//! calibrated reference image of the closed door.
//!
//! # Architecture
//!
//! Frames flow through a fixed pipeline:
//!
//! 1. **Ingest**: a camera or clip source decodes into packed RGB8 frames.
//! 2. **Crop**: the configured region of interest is cut out of the frame.
//! 3. **Diff**: the crop is measured against the calibrated reference as a
//!    mean absolute per-channel difference, in percent of the 8-bit range.
//! 4. **Classify**: strictly above the threshold reads OPEN, otherwise
//!    CLOSED. A change exactly at the threshold stays CLOSED.
//! 5. **Record**: samples land in an append-only session history, either
//!    every frame (offline scans) or only on state flips (live monitors).
//!
//! The measurement is integer-accumulated and divided once, so identical
//! inputs produce bit-identical percentages on every platform. Failed
//! operations never leave partial state behind: an engine that returns an
//! error still holds exactly what it held before the call.
//!
//! One `DetectionEngine` is one monitoring session. Engines are not
//! internally synchronized; share one across threads behind a mutex, or give
//! each stream its own.
//!
//! # Module Structure
//!
//! - `frame`: packed RGB8 frames and cropping
//! - `roi`: region-of-interest geometry and the per-session store
//! - `calibration`: reference image capture and ownership
//! - `diff`: change measurement
//! - `classify`: threshold comparison and sensitivity steps
//! - `engine`: the per-session state machine
//! - `history`: change samples, record policies, exports
//! - `ingest`: camera and clip sources
//! - `config`: daemon configuration (file + environment)

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod calibration;
pub mod classify;
pub mod config;
pub mod diff;
pub mod engine;
pub mod frame;
pub mod history;
pub mod ingest;
pub mod roi;

pub use calibration::{CalibrationStore, ReferenceImage};
pub use classify::{
    adjust_threshold, clamp_to_band, classify, SensitivityDirection, DEFAULT_SENSITIVITY_STEP,
    DEFAULT_THRESHOLD_PERCENTAGE, THRESHOLD_BAND_MAX, THRESHOLD_BAND_MIN,
};
pub use config::DoorwatchConfig;
pub use diff::change_percentage;
pub use engine::DetectionEngine;
pub use frame::{Frame, FRAME_CHANNELS};
pub use history::{ChangeSample, HistoryLog, RecordPolicy};
pub use ingest::{
    CameraConfig, CameraSource, CameraStats, ClipConfig, ClipSource, ClipStats, SourcedFrame,
};
pub use roi::{Roi, RoiStore};

// -------------------- Detection State --------------------

/// Door state as seen by a session.
///
/// Sessions start `Uncalibrated` and reach `Closed` through calibration,
/// since the reference image is by definition the closed door. After that,
/// every processed frame lands on `Closed` or `Open`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DetectionState {
    Uncalibrated,
    Closed,
    Open,
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectionState::Uncalibrated => "UNCALIBRATED",
            DetectionState::Closed => "CLOSED",
            DetectionState::Open => "OPEN",
        };
        // pad() honors caller width specs, write_str() would not.
        f.pad(name)
    }
}

// -------------------- Errors --------------------

/// Failures of the detection core.
///
/// Every variant is a refusal, not a partial result: the operation that
/// returned it changed nothing. Binaries wrap these in `anyhow` at the edge.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectError {
    /// Rectangle geometry is unusable: zero-sized, or outside the frame
    /// bounds when those are already known.
    InvalidRoi {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bounds: Option<(u32, u32)>,
    },
    /// An operation needed a rectangle before one was configured.
    RoiNotSet,
    /// The rectangle does not fit inside the frame being cropped.
    CropOutOfBounds {
        roi: roi::Roi,
        frame_width: u32,
        frame_height: u32,
    },
    /// Frames cannot be measured before a reference image exists.
    NotCalibrated,
    /// The current crop and the reference differ in size, typically because
    /// the camera resolution changed mid-session.
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::InvalidRoi {
                x,
                y,
                width,
                height,
                bounds,
            } => {
                write!(f, "invalid roi {}x{}+{}+{}: ", width, height, x, y)?;
                match bounds {
                    Some((frame_width, frame_height)) => write!(
                        f,
                        "exceeds frame bounds {}x{}",
                        frame_width, frame_height
                    ),
                    None => write!(f, "width and height must be positive"),
                }
            }
            DetectError::RoiNotSet => write!(f, "no region of interest set"),
            DetectError::CropOutOfBounds {
                roi,
                frame_width,
                frame_height,
            } => write!(
                f,
                "roi {} does not fit inside {}x{} frame",
                roi, frame_width, frame_height
            ),
            DetectError::NotCalibrated => write!(f, "not calibrated"),
            DetectError::DimensionMismatch { expected, actual } => write!(
                f,
                "crop size changed: reference is {}x{}, current is {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
        }
    }
}

impl std::error::Error for DetectError {}

// -------------------- Tests --------------------
