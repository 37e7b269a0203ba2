use anyhow::{anyhow, Result};
use serde::Serialize;

/// Axis-aligned box in absolute pixel coordinates.
///
/// The origin may sit outside the frame (models emit slightly negative
/// coordinates near the border); extents are unsigned so they are never negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from corner coordinates. Inverted corners collapse to a zero extent.
    pub fn from_corners(start_x: i32, start_y: i32, end_x: i32, end_y: i32) -> Self {
        Self {
            x: start_x,
            y: start_y,
            width: end_x.saturating_sub(start_x).max(0) as u32,
            height: end_y.saturating_sub(start_y).max(0) as u32,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// One candidate produced by a detector for a single frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    bbox: BoundingBox,
    class_id: u32,
    confidence: f32,
}

impl Detection {
    /// Fails unless `confidence` is a finite value in `[0, 1]`.
    pub fn new(bbox: BoundingBox, class_id: u32, confidence: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(anyhow!(
                "detection confidence {} outside [0, 1]",
                confidence
            ));
        }
        Ok(Self {
            bbox,
            class_id,
            confidence,
        })
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}
