//! Synthetic door scene.
//!
//! `stub://` sources render this scene instead of talking to hardware: a
//! static textured wall with a door-sized rectangle that flips between a
//! closed (dark) and an open (bright) fill. Rendering is a pure function of
//! frame size and door state, so stub runs are reproducible end to end.

use rand::rngs::StdRng;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::frame::Frame;
use crate::roi::Roi;

/// Door fill when closed: dark wood.
const DOOR_CLOSED_RGB: [u8; 3] = [54, 38, 28];
/// Door fill when open: the bright hallway behind it.
const DOOR_OPEN_RGB: [u8; 3] = [208, 204, 196];

/// Rectangle the synthetic door occupies in a frame of the given size:
/// the middle third horizontally, the middle half vertically.
pub fn door_region(width: u32, height: u32) -> Roi {
    Roi {
        x: width / 3,
        y: height / 4,
        width: (width / 3).max(1),
        height: (height / 2).max(1),
    }
}

/// Render one frame of the scene.
pub(crate) fn paint(width: u32, height: u32, door_open: bool) -> Frame {
    let mut frame = Frame::filled(width, height, [0, 0, 0]);
    for y in 0..height {
        for x in 0..width {
            frame.put_pixel(x, y, wall_pixel(x, y));
        }
    }
    let door = door_region(width, height);
    let fill = if door_open {
        DOOR_OPEN_RGB
    } else {
        DOOR_CLOSED_RGB
    };
    frame.fill_region(&door, fill);
    frame
}

/// Static wall texture, independent of time.
fn wall_pixel(x: u32, y: u32) -> [u8; 3] {
    let v = 96 + ((x * 31 + y * 17) % 64) as u8;
    [v, v, v]
}

/// Per-channel jitter in [-amplitude, +amplitude], clamped to the byte range.
/// Simulates sensor noise so consecutive live frames are not byte-identical.
pub(crate) fn apply_noise(frame: &mut Frame, rng: &mut StdRng, amplitude: u8) {
    if amplitude == 0 {
        return;
    }
    let amp = amplitude as i16;
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let mut rgb = frame.pixel(x, y);
            for channel in rgb.iter_mut() {
                let delta = rng.gen_range(-amp..=amp);
                *channel = (*channel as i16 + delta).clamp(0, 255) as u8;
            }
            frame.put_pixel(x, y, rgb);
        }
    }
}

/// Stable RNG seed derived from the source name.
pub(crate) fn seed_for(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    u64::from_le_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

/// Door schedule for finite clips: closed, then open for the middle third,
/// then closed again.
pub(crate) fn scripted_open(index: u64, total: u64) -> bool {
    let lo = total / 3;
    let hi = (2 * total) / 3;
    index >= lo && index < hi
}

/// Door schedule for endless live feeds: mostly closed with a regular
/// open episode.
pub(crate) fn cycle_open(index: u64) -> bool {
    index % 150 >= 100
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn door_region_fits_inside_any_frame() {
        for (w, h) in [(640, 480), (64, 64), (3, 3), (1, 1), (2, 5)] {
            let door = door_region(w, h);
            assert!(door.width > 0 && door.height > 0);
            assert!(door.fits_within(w, h), "door {} outside {}x{}", door, w, h);
        }
    }

    #[test]
    fn painting_is_deterministic() {
        assert_eq!(paint(64, 48, false), paint(64, 48, false));
        assert_eq!(paint(64, 48, true), paint(64, 48, true));
        assert_ne!(paint(64, 48, false), paint(64, 48, true));
    }

    #[test]
    fn open_and_closed_differ_only_inside_the_door() {
        let closed = paint(60, 40, false);
        let open = paint(60, 40, true);
        let door = door_region(60, 40);

        assert_eq!(closed.pixel(0, 0), open.pixel(0, 0));
        assert_eq!(
            closed.pixel(door.x, door.y + door.height),
            open.pixel(door.x, door.y + door.height)
        );
        assert_ne!(closed.pixel(door.x, door.y), open.pixel(door.x, door.y));
    }

    #[test]
    fn scripted_clip_is_closed_open_closed() {
        let states: Vec<bool> = (0..9).map(|i| scripted_open(i, 9)).collect();
        assert_eq!(
            states,
            vec![false, false, false, true, true, true, false, false, false]
        );

        // Degenerate lengths never panic and never open.
        assert!(!scripted_open(0, 1));
    }

    #[test]
    fn noise_stays_within_amplitude() {
        let mut frame = Frame::filled(16, 16, [100, 100, 100]);
        let mut rng = StdRng::seed_from_u64(seed_for("stub://door"));
        apply_noise(&mut frame, &mut rng, 3);
        for y in 0..16 {
            for x in 0..16 {
                for channel in frame.pixel(x, y) {
                    assert!((97..=103).contains(&channel));
                }
            }
        }
    }

    #[test]
    fn zero_amplitude_noise_is_identity() {
        let mut frame = paint(32, 32, false);
        let before = frame.clone();
        let mut rng = StdRng::seed_from_u64(1);
        apply_noise(&mut frame, &mut rng, 0);
        assert_eq!(frame, before);
    }
}
