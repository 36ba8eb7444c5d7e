//! Threshold classification and sensitivity adjustment.
//!
//! A measured change percentage becomes a door state by comparison against
//! one tunable threshold. The comparison is strictly greater-than: a change
//! exactly equal to the threshold still reads as closed, so a scene sitting
//! right at the limit does not flap.

use serde::{Deserialize, Serialize};

use crate::DetectionState;

/// Threshold applied when nothing else is configured, in percent.
pub const DEFAULT_THRESHOLD_PERCENTAGE: f64 = 5.0;

/// How far one sensitivity nudge moves the threshold, in percent.
pub const DEFAULT_SENSITIVITY_STEP: f64 = 1.0;

/// Conventional working band for interactive tuning. The classifier itself
/// accepts any positive threshold; front-ends clamp to keep a slider usable.
pub const THRESHOLD_BAND_MIN: f64 = 1.0;
pub const THRESHOLD_BAND_MAX: f64 = 15.0;

/// Which way to nudge the detection threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensitivityDirection {
    /// Raise the threshold, tolerating more change before reporting OPEN.
    Increase,
    /// Lower the threshold, reporting OPEN on smaller changes.
    Decrease,
}

/// Classify a measured change against the threshold.
pub fn classify(change_percentage: f64, threshold_percentage: f64) -> DetectionState {
    if change_percentage > threshold_percentage {
        DetectionState::Open
    } else {
        DetectionState::Closed
    }
}

/// Move the threshold one step in the given direction. No clamping happens
/// here, so an increase followed by a decrease restores the exact value.
pub fn adjust_threshold(
    threshold_percentage: f64,
    direction: SensitivityDirection,
    step: f64,
) -> f64 {
    match direction {
        SensitivityDirection::Increase => threshold_percentage + step,
        SensitivityDirection::Decrease => threshold_percentage - step,
    }
}

/// Clamp a threshold into the conventional tuning band.
pub fn clamp_to_band(threshold_percentage: f64) -> f64 {
    threshold_percentage.clamp(THRESHOLD_BAND_MIN, THRESHOLD_BAND_MAX)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_at_threshold_reads_closed() {
        assert_eq!(classify(5.0, 5.0), DetectionState::Closed);
        assert_eq!(classify(4.999, 5.0), DetectionState::Closed);
        assert_eq!(classify(0.0, 5.0), DetectionState::Closed);
    }

    #[test]
    fn change_above_threshold_reads_open() {
        assert_eq!(classify(5.0 + f64::EPSILON * 8.0, 5.0), DetectionState::Open);
        assert_eq!(classify(5.001, 5.0), DetectionState::Open);
        assert_eq!(classify(100.0, 5.0), DetectionState::Open);
    }

    #[test]
    fn adjustment_round_trips_exactly() {
        let start = DEFAULT_THRESHOLD_PERCENTAGE;
        let up = adjust_threshold(start, SensitivityDirection::Increase, 1.0);
        assert_eq!(up, 6.0);
        let back = adjust_threshold(up, SensitivityDirection::Decrease, 1.0);
        assert_eq!(back, start);

        // Fractional steps round trip too.
        let up = adjust_threshold(start, SensitivityDirection::Increase, 0.5);
        let back = adjust_threshold(up, SensitivityDirection::Decrease, 0.5);
        assert_eq!(back, start);
    }

    #[test]
    fn adjustment_is_not_clamped() {
        let low = adjust_threshold(1.0, SensitivityDirection::Decrease, 1.0);
        assert_eq!(low, 0.0);
        let high = adjust_threshold(15.0, SensitivityDirection::Increase, 1.0);
        assert_eq!(high, 16.0);
    }

    #[test]
    fn band_clamp_caps_both_ends() {
        assert_eq!(clamp_to_band(0.0), THRESHOLD_BAND_MIN);
        assert_eq!(clamp_to_band(7.5), 7.5);
        assert_eq!(clamp_to_band(40.0), THRESHOLD_BAND_MAX);
    }
}
