//! Frame differencing against the calibrated reference.
//!
//! One measurement: the mean absolute per-channel difference between the
//! current crop and the reference crop, expressed as a percentage of the
//! full 8-bit range. 0.0 means pixel-identical, 100.0 means every channel
//! sample differs by 255.
//!
//! The sum is accumulated in integers and divided exactly once, so the same
//! frame pair always produces the same bits regardless of platform or
//! optimization level.

use crate::calibration::ReferenceImage;
use crate::frame::Frame;
use crate::roi::Roi;
use crate::DetectError;

/// Measure how much `frame` differs from `reference` inside `roi`.
///
/// Fails with `CropOutOfBounds` when the rectangle does not fit inside the
/// frame, and with `DimensionMismatch` when the crop and the reference are
/// not the same size (a camera resolution change mid-session shows up here).
pub fn change_percentage(
    frame: &Frame,
    roi: &Roi,
    reference: &ReferenceImage,
) -> Result<f64, DetectError> {
    let crop = frame.crop(roi)?;
    if crop.dimensions() != reference.dimensions() {
        return Err(DetectError::DimensionMismatch {
            expected: reference.dimensions(),
            actual: crop.dimensions(),
        });
    }

    let current = crop.as_bytes();
    let baseline = reference.as_bytes();
    let samples = current.len() as u64;
    if samples == 0 {
        // Zero-area crops contribute no change.
        return Ok(0.0);
    }

    let sum = absolute_difference_sum(current, baseline);
    Ok(sum as f64 * 100.0 / (samples as f64 * 255.0))
}

/// Sum of |a[i] - b[i]| over two equal-length byte slices.
///
/// Fits comfortably in u64: even a 4096x4096 RGB crop maxes out near 1.3e10.
fn absolute_difference_sum(a: &[u8], b: &[u8]) -> u64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
