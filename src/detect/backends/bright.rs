use anyhow::Result;

use crate::detect::backend::Detector;
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::rgb_len;

/// Model-free backend that reports the region of bright pixels as one candidate.
///
/// The box spans every pixel whose luma exceeds `threshold`; confidence is the
/// fraction of that box that is actually bright. Pairs with the synthetic
/// `stub://` source, which paints a bright subject on a dark background.
pub struct BrightRegionBackend {
    class_id: u32,
    threshold: u8,
    min_pixels: usize,
}

impl BrightRegionBackend {
    pub fn new(class_id: u32) -> Self {
        Self {
            class_id,
            threshold: 200,
            min_pixels: 16,
        }
    }

    pub fn with_min_pixels(mut self, min_pixels: usize) -> Self {
        self.min_pixels = min_pixels;
        self
    }
}

impl Detector for BrightRegionBackend {
    fn name(&self) -> &'static str {
        "bright-region"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let expected = rgb_len(width, height)?;
        if pixels.len() != expected {
            anyhow::bail!("expected {} RGB bytes, received {}", expected, pixels.len());
        }

        let w = width as usize;
        let mut count = 0usize;
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);
        for (idx, px) in pixels.chunks_exact(3).enumerate() {
            if luma(px) <= self.threshold {
                continue;
            }
            let (x, y) = (idx % w, idx / w);
            count += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if count < self.min_pixels.max(1) {
            return Ok(Vec::new());
        }

        let bbox = BoundingBox::new(
            min_x as i32,
            min_y as i32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        );
        let fill = count as f32 / bbox.area() as f32;
        Ok(vec![Detection::new(bbox, self.class_id, fill.min(1.0))?])
    }
}

fn luma(px: &[u8]) -> u8 {
    let weighted = px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114;
    (weighted / 1000) as u8
}
