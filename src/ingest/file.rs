//! Local still-image source.
//!
//! Plays back a single image file or every image in a directory, in file-name
//! order. The end of the list is the end of the stream.

use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::{FrameSource, SourceStats};
use crate::error::TrackError;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Configuration for a local image source.
#[derive(Clone, Debug)]
pub struct ImageDirConfig {
    /// Image file or directory of images.
    pub path: PathBuf,
}

pub struct ImageDirSource {
    config: ImageDirConfig,
    pending: Option<VecDeque<PathBuf>>,
    frame_count: u64,
}

impl ImageDirSource {
    pub fn new(config: ImageDirConfig) -> Result<Self> {
        if config.path.as_os_str().is_empty() {
            return Err(anyhow!("image source path is empty"));
        }
        Ok(Self {
            config,
            pending: None,
            frame_count: 0,
        })
    }

    /// Number of images not yet delivered.
    pub fn remaining(&self) -> usize {
        self.pending.as_ref().map_or(0, VecDeque::len)
    }
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> String {
        self.config.path.display().to_string()
    }

    fn connect(&mut self) -> Result<()> {
        let files = list_images(&self.config.path)?;
        log::info!(
            "ImageDirSource: {} image(s) queued from {}",
            files.len(),
            self.config.path.display()
        );
        self.pending = Some(files.into());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| anyhow!("image source not connected; call connect() first"))?;
        let Some(path) = pending.pop_front() else {
            return Err(TrackError::FrameUnavailable(format!(
                "no images left in {}",
                self.config.path.display()
            ))
            .into());
        };

        let image = image::open(&path)
            .with_context(|| format!("decode image {}", path.display()))?
            .into_rgb8();
        self.frame_count += 1;
        Frame::from_image(image, self.frame_count)
    }

    fn is_healthy(&self) -> bool {
        self.pending.is_some()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.name(),
        }
    }
}

fn list_images(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = std::fs::read_dir(path)
        .with_context(|| format!("read image directory {}", path.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry_path = entry?.path();
        if entry_path.is_file() && has_image_extension(&entry_path) {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn plays_images_in_name_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        RgbImage::from_pixel(8, 6, Rgb([1, 1, 1])).save(dir.path().join("b.png"))?;
        RgbImage::from_pixel(4, 2, Rgb([2, 2, 2])).save(dir.path().join("a.png"))?;
        std::fs::write(dir.path().join("notes.txt"), "not an image")?;

        let mut source = ImageDirSource::new(ImageDirConfig {
            path: dir.path().to_path_buf(),
        })?;
        source.connect()?;
        assert_eq!(source.remaining(), 2);

        let first = source.next_frame()?;
        assert_eq!((first.width, first.height, first.sequence), (4, 2, 1));
        let second = source.next_frame()?;
        assert_eq!((second.width, second.height, second.sequence), (8, 6, 2));

        let end = source.next_frame().unwrap_err();
        assert!(matches!(
            end.downcast_ref::<TrackError>(),
            Some(TrackError::FrameUnavailable(_))
        ));
        Ok(())
    }

    #[test]
    fn requires_connect() -> Result<()> {
        let mut source = ImageDirSource::new(ImageDirConfig {
            path: PathBuf::from("frames"),
        })?;
        assert!(source.next_frame().is_err());
        Ok(())
    }
}
