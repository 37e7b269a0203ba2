//! Frame ownership for one control cycle.
//!
//! - `Frame`: immutable RGB8 pixel buffer. Pixels are only reachable read-only.
//! - `Frame::run_detector`: hands the pixels to a `Detector` for one call.
//!
//! A frame is produced by a source, owned by the control loop for exactly one
//! cycle and dropped once that cycle's command is emitted.

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::detect::{Detection, Detector};

/// Bytes per pixel for the RGB8 layout every source normalises to.
pub const RGB_CHANNELS: usize = 3;

/// Immutable RGB8 frame.
///
/// There is no `&mut` accessor and no `Clone`: a frame belongs to one cycle.
#[derive(Debug)]
pub struct Frame {
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Capture order within the source, starting at 1.
    pub sequence: u64,
}

impl Frame {
    /// Wrap a packed RGB8 buffer. Fails when the length does not match the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    /// Solid-colour frame, mostly useful for tests and warm-up passes.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Result<Self> {
        let len = rgb_len(width, height)?;
        let data = rgb.iter().copied().cycle().take(len).collect();
        Self::new(data, width, height, sequence)
    }

    /// Convert a decoded image into a frame.
    pub fn from_image(image: RgbImage, sequence: u64) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, sequence)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Copy of the pixels as an `image` buffer (for saving or preprocessing).
    pub fn to_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| anyhow!("frame buffer does not fit {}x{}", self.width, self.height))
    }

    /// Run a detector over this frame.
    ///
    /// The detector sees the pixels only for the duration of the call.
    pub fn run_detector<D: Detector + ?Sized>(&self, detector: &mut D) -> Result<Vec<Detection>> {
        detector.detect(&self.data, self.width, self.height)
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(Frame::new(vec![0u8; 10], 2, 2, 1).is_err());
        assert!(Frame::new(vec![0u8; 12], 2, 2, 1).is_ok());
    }

    #[test]
    fn filled_frame_repeats_colour() -> Result<()> {
        let frame = Frame::filled(2, 1, [1, 2, 3], 7)?;
        assert_eq!(frame.pixels(), &[1, 2, 3, 1, 2, 3]);
        assert_eq!(frame.sequence, 7);
        Ok(())
    }

    #[test]
    fn image_round_trip_keeps_dimensions() -> Result<()> {
        let image = RgbImage::from_pixel(4, 3, image::Rgb([9, 9, 9]));
        let frame = Frame::from_image(image, 1)?;
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(frame.to_image()?.dimensions(), (4, 3));
        Ok(())
    }
}
