//! Synthetic frame source (`stub://`).
//!
//! Paints a bright square on a dark background and sweeps it left and right,
//! so a run exercises LEFT, CENTER and RIGHT without a camera or model.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use super::{FrameSource, SourceStats};
use crate::frame::{rgb_len, Frame};

const BACKGROUND: u8 = 16;
const SUBJECT: u8 = 240;
/// Frames for one pass from the left edge to the right edge.
const SWEEP_FRAMES: u64 = 40;

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Pace frames to this rate. 0 produces frames as fast as they are requested.
    pub target_fps: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "stub://camera".to_string(),
            width: 640,
            height: 480,
            target_fps: 10,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    last_frame_at: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if config.width < 4 || config.height < 4 {
            return Err(anyhow!(
                "synthetic frames must be at least 4x4, got {}x{}",
                config.width,
                config.height
            ));
        }
        rgb_len(config.width, config.height)?;
        Ok(Self {
            config,
            frame_count: 0,
            last_frame_at: None,
        })
    }

    /// Subject side length in pixels.
    pub fn subject_side(&self) -> u32 {
        (self.config.width.min(self.config.height) / 4).max(1)
    }

    /// Left edge of the subject in the given (1-based) frame.
    pub fn subject_x(&self, frame_number: u64) -> u32 {
        let travel = (self.config.width - self.subject_side()) as u64;
        let phase = frame_number.saturating_sub(1) % (2 * SWEEP_FRAMES);
        let step = if phase <= SWEEP_FRAMES {
            phase
        } else {
            2 * SWEEP_FRAMES - phase
        };
        (travel * step / SWEEP_FRAMES) as u32
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let side = self.subject_side() as usize;
        let x0 = self.subject_x(self.frame_count) as usize;
        let y0 = (height - side) / 2;

        let mut pixels = vec![BACKGROUND; width * height * 3];
        for y in y0..y0 + side {
            let row = (y * width + x0) * 3;
            pixels[row..row + side * 3].fill(SUBJECT);
        }
        pixels
    }

    fn pace(&mut self) {
        if self.config.target_fps == 0 {
            return;
        }
        let interval = Duration::from_millis((1000 / self.config.target_fps).max(1) as u64);
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> String {
        self.config.name.clone()
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("SyntheticSource: connected to {}", self.config.name);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        self.pace();
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Frame::new(pixels, self.config.width, self.config.height, self.frame_count)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.name.clone(),
        }
    }
}
