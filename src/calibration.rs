//! Reference image calibration.
//!
//! Calibration freezes the "door closed" appearance of the monitored
//! rectangle so later frames have something to be compared against.
//!
//! - `ReferenceImage`: the cropped baseline pixels, the rectangle they came
//!   from, and a content fingerprint for logging.
//! - `CalibrationStore`: owns at most one reference at a time. Detection
//!   borrows it read-only; replacing or clearing it goes through the store.

use sha2::{Digest, Sha256};

use crate::frame::Frame;
use crate::roi::Roi;
use crate::DetectError;

// ----------------------------------------------------------------------------
// ReferenceImage
// ----------------------------------------------------------------------------

/// Baseline crop captured at calibration time.
///
/// The pixels are immutable once captured. The fingerprint is a SHA-256 over
/// the crop bytes, used to tell recalibrations apart in logs.
#[derive(Clone, Debug)]
pub struct ReferenceImage {
    crop: Frame,
    roi: Roi,
    fingerprint: [u8; 32],
}

impl ReferenceImage {
    fn capture(frame: &Frame, roi: Roi) -> Result<Self, DetectError> {
        let crop = frame.crop(&roi)?;
        let fingerprint: [u8; 32] = Sha256::digest(crop.as_bytes()).into();
        Ok(Self {
            crop,
            roi,
            fingerprint,
        })
    }

    /// The rectangle this reference was cropped from.
    pub fn roi(&self) -> Roi {
        self.roi
    }

    /// Size of the baseline crop (equals the rectangle size).
    pub fn dimensions(&self) -> (u32, u32) {
        self.crop.dimensions()
    }

    /// Baseline pixels, row-major RGB8.
    pub fn as_bytes(&self) -> &[u8] {
        self.crop.as_bytes()
    }

    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    /// First 8 fingerprint bytes as hex, compact enough for log lines.
    pub fn short_fingerprint(&self) -> String {
        hex::encode(&self.fingerprint[..8])
    }
}

// ----------------------------------------------------------------------------
// CalibrationStore
// ----------------------------------------------------------------------------

/// Owns the current reference image, if any.
#[derive(Debug, Default)]
pub struct CalibrationStore {
    reference: Option<ReferenceImage>,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self { reference: None }
    }

    /// Capture a fresh reference from `frame` at `roi`, replacing any
    /// previous one. A failed crop leaves the previous reference in place.
    pub fn calibrate(&mut self, frame: &Frame, roi: Roi) -> Result<&ReferenceImage, DetectError> {
        let reference = ReferenceImage::capture(frame, roi)?;
        Ok(self.reference.insert(reference))
    }

    pub fn is_calibrated(&self) -> bool {
        self.reference.is_some()
    }

    pub fn reference(&self) -> Option<&ReferenceImage> {
        self.reference.as_ref()
    }

    pub fn clear(&mut self) {
        self.reference = None;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrate_captures_the_crop() {
        let mut frame = Frame::filled(100, 100, [0, 0, 0]);
        let roi = Roi::new(10, 20, 30, 40).unwrap();
        frame.fill_region(&roi, [50, 60, 70]);

        let mut store = CalibrationStore::new();
        assert!(!store.is_calibrated());

        let reference = store.calibrate(&frame, roi).unwrap();
        assert_eq!(reference.dimensions(), (30, 40));
        assert_eq!(reference.roi(), roi);
        assert_eq!(reference.as_bytes()[..3], [50, 60, 70]);
        assert!(store.is_calibrated());
    }

    #[test]
    fn recalibration_replaces_the_reference() {
        let roi = Roi::new(0, 0, 4, 4).unwrap();
        let mut store = CalibrationStore::new();

        let first = Frame::filled(8, 8, [1, 1, 1]);
        let fp1 = store.calibrate(&first, roi).unwrap().fingerprint();

        let second = Frame::filled(8, 8, [2, 2, 2]);
        let fp2 = store.calibrate(&second, roi).unwrap().fingerprint();

        assert_ne!(fp1, fp2);
        assert_eq!(store.reference().unwrap().fingerprint(), fp2);
    }

    #[test]
    fn failed_calibration_keeps_previous_reference() {
        let frame = Frame::filled(8, 8, [9, 9, 9]);
        let roi = Roi::new(0, 0, 8, 8).unwrap();
        let mut store = CalibrationStore::new();
        store.calibrate(&frame, roi).unwrap();

        let oversized = Roi::new(0, 0, 16, 16).unwrap();
        assert!(store.calibrate(&frame, oversized).is_err());
        assert!(store.is_calibrated());
        assert_eq!(store.reference().unwrap().roi(), roi);
    }

    #[test]
    fn short_fingerprint_is_stable_hex() {
        let frame = Frame::filled(8, 8, [3, 3, 3]);
        let roi = Roi::new(0, 0, 8, 8).unwrap();
        let mut store = CalibrationStore::new();
        let reference = store.calibrate(&frame, roi).unwrap();
        let short = reference.short_fingerprint();
        assert_eq!(short.len(), 16);
        assert_eq!(short, hex::encode(&reference.fingerprint()[..8]));
    }
}
