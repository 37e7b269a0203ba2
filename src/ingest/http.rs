//! HTTP frame source for network cameras such as the ESP32-CAM.
//!
//! Two modes, picked from the response content type at connect time:
//! - `multipart/x-mixed-replace` MJPEG streams, split on JPEG SOI/EOI markers
//! - single stills (JPEG or BMP), re-fetched for every frame
//!
//! Frames are decimated to `target_fps`. A failed read ends the stream.
//!
//! Some ESP32 camera firmwares put a 54-byte BMP file header in front of an
//! encoded JPEG still. Such bodies do not decode as BMP, so decoding falls back
//! to the payload after that header.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::{Duration, Instant};

use url::Url;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// BITMAPFILEHEADER + BITMAPINFOHEADER.
const BMP_HEADER_LEN: usize = 54;

/// Configuration for an HTTP source.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Stream or snapshot URL, e.g. `http://192.168.4.1:81/stream`.
    pub url: String,
    /// Target frame rate. Frames arriving faster are dropped; 0 keeps all.
    pub target_fps: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: "http://192.168.4.1/".to_string(),
            target_fps: 10,
        }
    }
}

pub struct HttpSource {
    config: HttpConfig,
    stream: Option<HttpStream>,
    connected_at: Option<Instant>,
    last_frame_at: Option<Instant>,
    frame_count: u64,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    /// Body of the connect request, consumed by the first frame.
    Still(Option<Vec<u8>>),
}

impl HttpSource {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let url = Url::parse(&config.url).context("parse camera url")?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported camera scheme '{}'; expected http(s)",
                url.scheme()
            ));
        }
        Ok(Self {
            config,
            stream: None,
            connected_at: None,
            last_frame_at: None,
            frame_count: 0,
        })
    }

    fn read_image(&mut self) -> Result<Vec<u8>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("http source not connected; call connect() first"))?;
        match stream {
            HttpStream::Mjpeg(mjpeg) => mjpeg.read_next_jpeg(),
            HttpStream::Still(first) => match first.take() {
                Some(bytes) => Ok(bytes),
                None => fetch_still_bytes(&self.config.url),
            },
        }
    }
}

impl FrameSource for HttpSource {
    fn name(&self) -> String {
        self.config.url.clone()
    }

    fn connect(&mut self) -> Result<()> {
        let response = ureq::get(&self.config.url)
            .call()
            .with_context(|| format!("connect to camera at {}", self.config.url))?;
        let content_type = response.header("Content-Type").unwrap_or("").to_lowercase();
        if content_type.contains("multipart") {
            self.stream = Some(HttpStream::Mjpeg(MjpegStream::new(response.into_reader())));
        } else {
            let body = read_body(response.into_reader())?;
            self.stream = Some(HttpStream::Still(Some(body)));
        }
        self.connected_at = Some(Instant::now());
        log::info!(
            "HttpSource: connected to {} ({})",
            self.config.url,
            if content_type.contains("multipart") {
                "mjpeg"
            } else {
                "still"
            }
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let min_interval = frame_interval(self.config.target_fps);
        loop {
            let bytes = self.read_image()?;
            let now = Instant::now();
            if let Some(last) = self.last_frame_at {
                if now.duration_since(last) < min_interval {
                    continue;
                }
            }
            let image = decode_image(&bytes)?;
            self.frame_count += 1;
            self.last_frame_at = Some(now);
            return Frame::from_image(image, self.frame_count);
        }
    }

    fn is_healthy(&self) -> bool {
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        let Some(last_frame_at) = self.last_frame_at else {
            return connected_at.elapsed() <= Duration::from_secs(5);
        };
        last_frame_at.elapsed() <= health_grace(self.config.target_fps)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.url.clone(),
        }
    }
}

/// Fetch one still image and decode it.
pub fn fetch_still(url: &str) -> Result<Frame> {
    let bytes = fetch_still_bytes(url)?;
    Frame::from_image(decode_image(&bytes)?, 1)
}

struct MjpegStream {
    reader: Box<dyn Read + Send + Sync>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    fn new(reader: Box<dyn Read + Send + Sync>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    fn read_next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Err(anyhow!("mjpeg stream ended"));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_IMAGE_BYTES * 2 {
                let keep = 2.min(self.buffer.len());
                let drain_len = self.buffer.len() - keep;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

fn fetch_still_bytes(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("fetch still from {}", url))?;
    read_body(response.into_reader())
}

fn read_body(reader: impl Read) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .take(MAX_IMAGE_BYTES as u64 + 1)
        .read_to_end(&mut bytes)
        .context("read image body")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty image body"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(anyhow!("image body exceeds {} bytes", MAX_IMAGE_BYTES));
    }
    Ok(bytes)
}

fn decode_image(bytes: &[u8]) -> Result<image::RgbImage> {
    let image = match image::load_from_memory(bytes) {
        Ok(image) => image,
        Err(err) => match bytes.get(BMP_HEADER_LEN..) {
            Some(payload) if bytes.starts_with(b"BM") && !payload.is_empty() => {
                log::debug!("full body did not decode ({}); retrying after BMP header", err);
                image::load_from_memory(payload).context("decode camera image after BMP header")?
            }
            _ => return Err(anyhow::Error::new(err).context("decode camera image")),
        },
    };
    Ok(image.into_rgb8())
}

fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let start = buffer.windows(2).position(|w| w == [0xFF, 0xD8])?;
    let end = buffer[start + 2..]
        .windows(2)
        .position(|w| w == [0xFF, 0xD9])?;
    Some((start, start + 2 + end + 2))
}

fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::from_millis(0)
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

fn health_grace(target_fps: u32) -> Duration {
    let base_ms = if target_fps == 0 {
        2_000
    } else {
        (1000 / target_fps).saturating_mul(6)
    };
    Duration::from_millis(base_ms.max(2_000) as u64)
}
