use anyhow::Result;

use crate::detect::result::Detection;

/// Detector boundary.
///
/// An implementation wraps one loaded model. It is constructed once at startup
/// (load failures surface as `TrackError::ModelUnavailable` from the constructor)
/// and then owned by the control loop, which calls `detect` once per frame.
///
/// Implementations must:
/// - treat the pixel slice as read-only and not keep it past the call
/// - return boxes in absolute pixel coordinates of the frame they were given
/// - keep no per-frame state that changes later results for the same input
///
/// A returned `Err` is a per-frame inference failure. The caller logs it and
/// treats the frame as having zero detections.
pub trait Detector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a packed RGB8 frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, run once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        (**self).detect(pixels, width, height)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
