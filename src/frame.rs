//! Pixel frame container.
//!
//! Everything downstream of ingestion works on one frame layout:
//!
//! - `Frame`: owned, tightly packed RGB8 buffer (row-major, 3 bytes per pixel).
//! - `Frame::crop`: bounds-checked extraction of a region of interest.
//!
//! Sources normalize whatever they decode into this layout, so the detection
//! pipeline never has to care about strides, YUV planes, or alpha channels.

use crate::roi::Roi;
use crate::DetectError;

/// Bytes per pixel. Frames are always tightly packed RGB8.
pub const FRAME_CHANNELS: usize = 3;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// Owned RGB8 frame. Row-major, no padding between rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a raw RGB8 buffer. Returns `None` when the buffer length does not
    /// match `width * height * 3`, mirroring `image::ImageBuffer::from_raw`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * FRAME_CHANNELS;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Frame of a single solid color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * FRAME_CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw pixel bytes, row-major RGB8.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte offset of the pixel at (x, y). Caller guarantees in-bounds.
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * FRAME_CHANNELS
    }

    /// Read one pixel. Caller guarantees in-bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let o = self.offset(x, y);
        [self.data[o], self.data[o + 1], self.data[o + 2]]
    }

    /// Overwrite one pixel. Caller guarantees in-bounds.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let o = self.offset(x, y);
        self.data[o..o + FRAME_CHANNELS].copy_from_slice(&rgb);
    }

    /// Paint a rectangle with a solid color. The rectangle must lie within
    /// the frame; out-of-range parts are simply not painted.
    pub fn fill_region(&mut self, region: &Roi, rgb: [u8; 3]) {
        let x_end = region.x.saturating_add(region.width).min(self.width);
        let y_end = region.y.saturating_add(region.height).min(self.height);
        for y in region.y.min(self.height)..y_end {
            for x in region.x.min(self.width)..x_end {
                self.put_pixel(x, y, rgb);
            }
        }
    }

    /// Copy out the rectangle described by `roi` as a new frame.
    ///
    /// Fails with `CropOutOfBounds` when the rectangle does not fit inside
    /// this frame. The source frame is left untouched either way.
    pub fn crop(&self, roi: &Roi) -> Result<Frame, DetectError> {
        if !roi.fits_within(self.width, self.height) {
            return Err(DetectError::CropOutOfBounds {
                roi: *roi,
                frame_width: self.width,
                frame_height: self.height,
            });
        }
        let row_bytes = roi.width as usize * FRAME_CHANNELS;
        let mut data = Vec::with_capacity(roi.height as usize * row_bytes);
        for y in roi.y..roi.y + roi.height {
            let start = self.offset(roi.x, y);
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Ok(Frame {
            width: roi.width,
            height: roi.height,
            data,
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_rejects_wrong_length() {
        assert!(Frame::from_raw(2, 2, vec![0u8; 12]).is_some());
        assert!(Frame::from_raw(2, 2, vec![0u8; 11]).is_none());
        assert!(Frame::from_raw(2, 2, vec![0u8; 13]).is_none());
    }

    #[test]
    fn filled_frame_has_uniform_pixels() {
        let frame = Frame::filled(4, 3, [10, 20, 30]);
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.as_bytes().len(), 4 * 3 * FRAME_CHANNELS);
        assert_eq!(frame.pixel(0, 0), [10, 20, 30]);
        assert_eq!(frame.pixel(3, 2), [10, 20, 30]);
    }

    #[test]
    fn crop_extracts_expected_pixels() {
        let mut frame = Frame::filled(8, 8, [0, 0, 0]);
        frame.put_pixel(2, 3, [201, 202, 203]);
        frame.put_pixel(4, 5, [101, 102, 103]);

        let roi = Roi::new(2, 3, 3, 3).unwrap();
        let crop = frame.crop(&roi).unwrap();
        assert_eq!(crop.dimensions(), (3, 3));
        assert_eq!(crop.pixel(0, 0), [201, 202, 203]);
        assert_eq!(crop.pixel(2, 2), [101, 102, 103]);
    }

    #[test]
    fn crop_full_frame_is_identity() {
        let mut frame = Frame::filled(5, 4, [7, 7, 7]);
        frame.put_pixel(4, 3, [1, 2, 3]);
        let roi = Roi::new(0, 0, 5, 4).unwrap();
        assert_eq!(frame.crop(&roi).unwrap(), frame);
    }

    #[test]
    fn crop_out_of_bounds_is_rejected() {
        let frame = Frame::filled(8, 8, [0, 0, 0]);

        // One pixel past the right edge.
        let roi = Roi::new(5, 0, 4, 4).unwrap();
        let err = frame.crop(&roi).unwrap_err();
        assert!(matches!(err, DetectError::CropOutOfBounds { .. }));

        // One pixel past the bottom edge.
        let roi = Roi::new(0, 6, 4, 3).unwrap();
        assert!(frame.crop(&roi).is_err());

        // Exactly at the edge still works.
        let roi = Roi::new(4, 4, 4, 4).unwrap();
        assert!(frame.crop(&roi).is_ok());
    }

    #[test]
    fn fill_region_clips_to_frame() {
        let mut frame = Frame::filled(4, 4, [0, 0, 0]);
        let region = Roi::new(2, 2, 10, 10).unwrap();
        frame.fill_region(&region, [255, 0, 0]);
        assert_eq!(frame.pixel(1, 1), [0, 0, 0]);
        assert_eq!(frame.pixel(2, 2), [255, 0, 0]);
        assert_eq!(frame.pixel(3, 3), [255, 0, 0]);
    }
}
