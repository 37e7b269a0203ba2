//! Frame sources.
//!
//! - `stub://<name>` synthetic scene with a moving bright subject
//! - local image files or directories of stills
//! - HTTP MJPEG streams or still snapshots, e.g. ESP32 cameras (feature: ingest-http)
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//!
//! Every source yields packed RGB8 `Frame`s with increasing sequence numbers.
//! An `Err` from `next_frame` means the stream is over; the control loop stops
//! cleanly on it. Sources release their device or connection on drop.

pub mod file;
#[cfg(feature = "ingest-http")]
pub mod http;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::SourceSettings;
use crate::error::TrackError;
use crate::frame::Frame;

pub use file::{ImageDirConfig, ImageDirSource};
#[cfg(feature = "ingest-http")]
pub use http::{HttpConfig, HttpSource};
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// Input boundary polled once per control cycle.
pub trait FrameSource {
    /// Human-readable identifier (URL, path, device).
    fn name(&self) -> String;

    /// Open the underlying stream. Called once before the first frame.
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Block until the next frame is available. `Err` ends the stream.
    fn next_frame(&mut self) -> Result<Frame>;

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: 0,
            source: self.name(),
        }
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Ends any source after a fixed number of frames.
pub struct LimitedSource<S> {
    inner: S,
    limit: u64,
    delivered: u64,
}

impl<S: FrameSource> LimitedSource<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        Self {
            inner,
            limit,
            delivered: 0,
        }
    }
}

impl<S: FrameSource> FrameSource for LimitedSource<S> {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn connect(&mut self) -> Result<()> {
        self.inner.connect()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if self.delivered >= self.limit {
            return Err(TrackError::FrameUnavailable(format!(
                "frame limit of {} reached",
                self.limit
            ))
            .into());
        }
        let frame = self.inner.next_frame()?;
        self.delivered += 1;
        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }

    fn stats(&self) -> SourceStats {
        self.inner.stats()
    }
}

/// Build a source from settings, choosing the backend by URL scheme.
///
/// The returned source is not yet connected.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource + Send>> {
    let url = settings.url.trim();
    let source: Box<dyn FrameSource + Send> = if url.starts_with("stub://") {
        Box::new(SyntheticSource::new(SyntheticConfig {
            name: url.to_string(),
            width: settings.width,
            height: settings.height,
            target_fps: settings.target_fps,
        })?)
    } else if url.starts_with("http://") || url.starts_with("https://") {
        open_http(settings)?
    } else if url.starts_with("v4l2://") || url.starts_with("/dev/video") {
        open_v4l2(settings)?
    } else if url.contains("://") {
        return Err(anyhow!("unsupported frame source '{}'", url));
    } else {
        Box::new(ImageDirSource::new(ImageDirConfig {
            path: Path::new(url).to_path_buf(),
        })?)
    };

    Ok(match settings.max_frames {
        Some(limit) => Box::new(LimitedSource::new(source, limit)),
        None => source,
    })
}

#[cfg(feature = "ingest-http")]
fn open_http(settings: &SourceSettings) -> Result<Box<dyn FrameSource + Send>> {
    Ok(Box::new(HttpSource::new(HttpConfig {
        url: settings.url.trim().to_string(),
        target_fps: settings.target_fps,
    })?))
}

#[cfg(not(feature = "ingest-http"))]
fn open_http(_settings: &SourceSettings) -> Result<Box<dyn FrameSource + Send>> {
    Err(anyhow!("HTTP frame sources require the ingest-http feature"))
}

#[cfg(feature = "ingest-v4l2")]
fn open_v4l2(settings: &SourceSettings) -> Result<Box<dyn FrameSource + Send>> {
    let url = settings.url.trim();
    let device = url.strip_prefix("v4l2://").unwrap_or(url).to_string();
    Ok(Box::new(V4l2Source::new(V4l2Config {
        device,
        target_fps: settings.target_fps,
        width: settings.width,
        height: settings.height,
    })))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_v4l2(_settings: &SourceSettings) -> Result<Box<dyn FrameSource + Send>> {
    Err(anyhow!("camera devices require the ingest-v4l2 feature"))
}
