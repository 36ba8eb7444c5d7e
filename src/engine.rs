//! Detection engine.
//!
//! One engine instance is one monitoring session. It owns the working state
//! of the pipeline:
//!
//! - the monitored rectangle (`RoiStore`)
//! - the calibrated reference (`CalibrationStore`)
//! - the tunable threshold and sensitivity step
//! - the current door state and the session `HistoryLog`
//!
//! The state machine is small: sessions start `Uncalibrated`, and the first
//! successful calibration moves them to `Closed`. After that every processed
//! frame lands on `Closed` or `Open`. Changing the rectangle drops the
//! reference and returns to `Uncalibrated`, since a reference cropped from
//! the old rectangle says nothing about the new one.
//!
//! Every method takes `&mut self` and every failure returns before any field
//! is touched, so a caller that serializes access (an `Arc<Mutex<_>>` per
//! session is the expected shape) never observes a half-applied operation.

use crate::calibration::{CalibrationStore, ReferenceImage};
use crate::classify::{
    self, SensitivityDirection, DEFAULT_SENSITIVITY_STEP, DEFAULT_THRESHOLD_PERCENTAGE,
};
use crate::diff;
use crate::frame::Frame;
use crate::history::{ChangeSample, HistoryLog, RecordPolicy};
use crate::roi::{Roi, RoiStore};
use crate::{DetectError, DetectionState};

// ----------------------------------------------------------------------------
// DetectionEngine
// ----------------------------------------------------------------------------

/// Per-session door state detector.
pub struct DetectionEngine {
    roi: RoiStore,
    calibration: CalibrationStore,
    threshold_percentage: f64,
    sensitivity_step: f64,
    state: DetectionState,
    history: HistoryLog,
    /// Size of the last frame seen, used to validate later rectangles.
    last_frame_dims: Option<(u32, u32)>,
}

impl DetectionEngine {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_THRESHOLD_PERCENTAGE, DEFAULT_SENSITIVITY_STEP)
    }

    /// Engine with explicit tuning, for callers restoring configured values.
    pub fn with_settings(threshold_percentage: f64, sensitivity_step: f64) -> Self {
        Self {
            roi: RoiStore::new(),
            calibration: CalibrationStore::new(),
            threshold_percentage,
            sensitivity_step,
            state: DetectionState::Uncalibrated,
            history: HistoryLog::new(),
            last_frame_dims: None,
        }
    }

    // ------------------------------------------------------------------
    // Region of interest
    // ------------------------------------------------------------------

    /// Install the rectangle to monitor.
    ///
    /// Once any frame has been seen, the rectangle must fit inside that
    /// frame size. Success drops the current reference (it was cropped from
    /// the old rectangle) and returns the session to `Uncalibrated`; failure
    /// leaves rectangle, reference, and state exactly as they were.
    pub fn set_roi(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<Roi, DetectError> {
        let roi = Roi::new(x, y, width, height)?;
        let installed = self.roi.set(roi, self.last_frame_dims)?;
        self.calibration.clear();
        self.state = DetectionState::Uncalibrated;
        log::debug!("roi set to {}", installed);
        Ok(installed)
    }

    pub fn roi(&self) -> Option<Roi> {
        self.roi.get()
    }

    // ------------------------------------------------------------------
    // Calibration
    // ------------------------------------------------------------------

    /// Capture `frame` as the new closed-door baseline.
    ///
    /// Requires a rectangle; the crop must fit inside the frame. On success
    /// the state becomes `Closed`. On failure nothing changes.
    pub fn calibrate(&mut self, frame: &Frame) -> Result<(), DetectError> {
        let roi = self.roi.get().ok_or(DetectError::RoiNotSet)?;
        let reference = self.calibration.calibrate(frame, roi)?;
        log::info!(
            "calibrated {} reference {} from {}x{} frame",
            roi,
            reference.short_fingerprint(),
            frame.width(),
            frame.height()
        );
        self.state = DetectionState::Closed;
        self.last_frame_dims = Some(frame.dimensions());
        Ok(())
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated()
    }

    pub fn reference(&self) -> Option<&ReferenceImage> {
        self.calibration.reference()
    }

    // ------------------------------------------------------------------
    // Frame processing
    // ------------------------------------------------------------------

    /// Measure one frame and update the session.
    ///
    /// The measured change is classified against the threshold, the sample
    /// is appended to the history according to `policy`, and the current
    /// state is updated. The returned sample is what was measured whether or
    /// not it was recorded. Fails with `NotCalibrated` until a baseline
    /// exists; any failure leaves state and history untouched.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        frame_index: u64,
        timestamp_s: f64,
        policy: RecordPolicy,
    ) -> Result<ChangeSample, DetectError> {
        let change_percentage = {
            let reference = self
                .calibration
                .reference()
                .ok_or(DetectError::NotCalibrated)?;
            let roi = reference.roi();
            diff::change_percentage(frame, &roi, reference)?
        };

        let state = classify::classify(change_percentage, self.threshold_percentage);
        let sample = ChangeSample {
            frame_index,
            timestamp_s,
            change_percentage,
            state,
        };

        let transitioned = state != self.state;
        let record = match policy {
            RecordPolicy::EveryFrame => true,
            RecordPolicy::TransitionsOnly => transitioned,
        };
        if record {
            self.history.append(sample);
        }
        if transitioned {
            log::debug!(
                "frame {}: {} -> {} ({:.2}% change, threshold {:.2}%)",
                frame_index,
                self.state,
                state,
                change_percentage,
                self.threshold_percentage
            );
        }
        self.state = state;
        self.last_frame_dims = Some(frame.dimensions());
        Ok(sample)
    }

    // ------------------------------------------------------------------
    // Tuning
    // ------------------------------------------------------------------

    /// Nudge the threshold one step. Returns the new threshold. The engine
    /// does not clamp; callers with a bounded control surface clamp through
    /// `set_threshold_percentage`.
    pub fn adjust_sensitivity(&mut self, direction: SensitivityDirection) -> f64 {
        self.threshold_percentage =
            classify::adjust_threshold(self.threshold_percentage, direction, self.sensitivity_step);
        log::debug!("threshold adjusted to {:.2}%", self.threshold_percentage);
        self.threshold_percentage
    }

    pub fn threshold_percentage(&self) -> f64 {
        self.threshold_percentage
    }

    pub fn set_threshold_percentage(&mut self, threshold_percentage: f64) {
        self.threshold_percentage = threshold_percentage;
    }

    pub fn sensitivity_step(&self) -> f64 {
        self.sensitivity_step
    }

    // ------------------------------------------------------------------
    // Session state
    // ------------------------------------------------------------------

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// End the session: drop rectangle, reference, and history, returning to
    /// `Uncalibrated`. Threshold tuning survives, it belongs to the operator
    /// rather than to the capture.
    pub fn reset(&mut self) {
        self.roi.clear();
        self.calibration.clear();
        self.history.clear();
        self.state = DetectionState::Uncalibrated;
        self.last_frame_dims = None;
        log::debug!("session reset");
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
