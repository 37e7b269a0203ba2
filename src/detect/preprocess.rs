//! Model input preparation.
//!
//! SSD-style models take a fixed square input, NCHW, with a per-channel
//! `(pixel - mean) * scale` normalisation.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::Deserialize;

use crate::frame::rgb_len;

/// Input geometry and normalisation for one model.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BlobParams {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    /// Per-channel mean in model channel order.
    pub mean: [f32; 3],
    /// Feed channels as BGR (models trained on OpenCV captures).
    pub swap_rb: bool,
}

impl Default for BlobParams {
    /// MobileNet-SSD reference: 300x300, scale 1/127.5, mean 127.5, BGR.
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            scale: 0.007843,
            mean: [127.5; 3],
            swap_rb: true,
        }
    }
}

impl BlobParams {
    pub fn len(&self) -> usize {
        3 * self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resize and normalise a packed RGB8 frame into an NCHW `f32` blob.
pub fn build_blob(pixels: &[u8], width: u32, height: u32, params: &BlobParams) -> Result<Vec<f32>> {
    if params.is_empty() {
        return Err(anyhow!("model input resolution must be non-zero"));
    }
    let expected = rgb_len(width, height)?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "expected {} RGB bytes, received {}",
            expected,
            pixels.len()
        ));
    }

    let source = RgbImage::from_raw(width, height, pixels.to_vec())
        .ok_or_else(|| anyhow!("frame buffer does not fit {}x{}", width, height))?;
    let resized = if (width, height) == (params.width, params.height) {
        source
    } else {
        imageops::resize(&source, params.width, params.height, FilterType::Triangle)
    };

    let plane = params.width as usize * params.height as usize;
    let mut blob = vec![0f32; params.len()];
    for (idx, pixel) in resized.pixels().enumerate() {
        for channel in 0..3 {
            let src = if params.swap_rb { 2 - channel } else { channel };
            blob[channel * plane + idx] =
                (pixel.0[src] as f32 - params.mean[channel]) * params.scale;
        }
    }
    Ok(blob)
}
