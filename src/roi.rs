//! Region-of-interest geometry.
//!
//! - `Roi`: the monitored rectangle, in pixel coordinates of the source frame.
//! - `Roi::parse_geometry`: parser for the X11-style "WxH+X+Y" string used by
//!   config files and CLI flags.
//! - `RoiStore`: holds the active rectangle for a session and validates
//!   replacements against the last known frame size.

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::sync::OnceLock;

use crate::DetectError;

// ----------------------------------------------------------------------------
// Roi
// ----------------------------------------------------------------------------

/// Monitored rectangle. `x`/`y` is the top-left corner in frame coordinates.
///
/// A `Roi` built through `Roi::new` always has non-zero width and height.
/// Whether it fits inside a given frame is a separate question answered by
/// `fits_within`, since the frame size may not be known yet when the
/// rectangle is configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Build a rectangle, rejecting degenerate geometry.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self, DetectError> {
        if width == 0 || height == 0 {
            return Err(DetectError::InvalidRoi {
                x,
                y,
                width,
                height,
                bounds: None,
            });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// True when the rectangle lies entirely inside a frame of the given size.
    /// Sums are taken in u64 so corner coordinates near `u32::MAX` cannot wrap.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x as u64 + self.width as u64 <= frame_width as u64
            && self.y as u64 + self.height as u64 <= frame_height as u64
    }

    /// Number of pixels covered by the rectangle.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Parse an "WxH+X+Y" geometry string, e.g. `"300x400+100+100"`.
    ///
    /// Allowed: `"640x480+0+0"`, `"300x400+100+100"`
    /// Disallowed: negative offsets, missing parts, zero width or height.
    pub fn parse_geometry(s: &str) -> Result<Self> {
        // Compile once for hot paths.
        static GEOMETRY_RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = GEOMETRY_RE
            .get_or_init(|| regex::Regex::new(r"^(\d+)x(\d+)\+(\d+)\+(\d+)$").unwrap());

        let caps = re
            .captures(s.trim())
            .ok_or_else(|| anyhow!("roi geometry must match WxH+X+Y, got {:?}", s))?;
        let field = |i: usize, name: &str| -> Result<u32> {
            caps[i]
                .parse::<u32>()
                .with_context(|| format!("roi {} out of range in {:?}", name, s))
        };
        let width = field(1, "width")?;
        let height = field(2, "height")?;
        let x = field(3, "x offset")?;
        let y = field(4, "y offset")?;
        Ok(Roi::new(x, y, width, height)?)
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

// ----------------------------------------------------------------------------
// RoiStore
// ----------------------------------------------------------------------------

/// Holds the rectangle currently being monitored, if any.
///
/// Replacing the rectangle is validated here; invalidating dependent state
/// (the calibrated reference) is the engine's job.
#[derive(Debug, Default)]
pub struct RoiStore {
    current: Option<Roi>,
}

impl RoiStore {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Install a new rectangle. When the frame size is already known, the
    /// rectangle must fit inside it. A rejected rectangle leaves the store
    /// unchanged.
    pub fn set(&mut self, roi: Roi, frame_dims: Option<(u32, u32)>) -> Result<Roi, DetectError> {
        if let Some((frame_width, frame_height)) = frame_dims {
            if !roi.fits_within(frame_width, frame_height) {
                return Err(DetectError::InvalidRoi {
                    x: roi.x,
                    y: roi.y,
                    width: roi.width,
                    height: roi.height,
                    bounds: Some((frame_width, frame_height)),
                });
            }
        }
        self.current = Some(roi);
        Ok(roi)
    }

    pub fn get(&self) -> Option<Roi> {
        self.current
    }

    pub fn is_set(&self) -> bool {
        self.current.is_some()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_dimensions() {
        assert!(Roi::new(0, 0, 0, 10).is_err());
        assert!(Roi::new(0, 0, 10, 0).is_err());
        assert!(Roi::new(5, 5, 1, 1).is_ok());
    }

    #[test]
    fn fits_within_checks_both_edges() {
        let roi = Roi::new(100, 100, 300, 400).unwrap();
        assert!(roi.fits_within(400, 500));
        assert!(!roi.fits_within(399, 500));
        assert!(!roi.fits_within(400, 499));
    }

    #[test]
    fn fits_within_does_not_wrap_near_u32_max() {
        let roi = Roi::new(u32::MAX, u32::MAX, 2, 2).unwrap();
        assert!(!roi.fits_within(u32::MAX, u32::MAX));
    }

    #[test]
    fn geometry_round_trips_through_display() {
        let roi = Roi::new(100, 150, 300, 400).unwrap();
        let parsed = Roi::parse_geometry(&roi.to_string()).unwrap();
        assert_eq!(parsed, roi);
    }

    #[test]
    fn parse_geometry_accepts_standard_forms() {
        let roi = Roi::parse_geometry("300x400+100+100").unwrap();
        assert_eq!(
            roi,
            Roi {
                x: 100,
                y: 100,
                width: 300,
                height: 400
            }
        );
        assert_eq!(
            Roi::parse_geometry(" 640x480+0+0 ").unwrap(),
            Roi::new(0, 0, 640, 480).unwrap()
        );
    }

    #[test]
    fn parse_geometry_rejects_malformed_input() {
        for bad in [
            "",
            "300x400",
            "300x400+100",
            "-300x400+100+100",
            "300x400+100+100+9",
            "axb+c+d",
            "0x400+1+1",
            "99999999999x1+0+0",
        ] {
            assert!(Roi::parse_geometry(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn store_validates_against_known_frame_size() {
        let mut store = RoiStore::new();
        let roi = Roi::new(10, 10, 100, 100).unwrap();

        // No frame seen yet, any well-formed rectangle is accepted.
        assert!(store.set(roi, None).is_ok());
        assert_eq!(store.get(), Some(roi));

        // Against known bounds the oversized rectangle is rejected and the
        // previous one stays in place.
        let too_big = Roi::new(0, 0, 200, 50).unwrap();
        let err = store.set(too_big, Some((160, 120))).unwrap_err();
        assert!(matches!(
            err,
            DetectError::InvalidRoi {
                bounds: Some((160, 120)),
                ..
            }
        ));
        assert_eq!(store.get(), Some(roi));

        store.clear();
        assert!(!store.is_set());
    }
}
