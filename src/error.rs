//! Failure taxonomy for the tracking pipeline.
//!
//! Most plumbing returns `anyhow::Result` with context attached. `TrackError`
//! exists for the failures a caller has to branch on:
//!
//! - `ModelUnavailable` and `Config` are fatal and surface before the loop starts.
//! - `FrameUnavailable` ends the loop gracefully (end of stream).
//! - `Inference` is recoverable: the cycle degrades to zero detections.
//!
//! "No qualifying target" is deliberately absent. It is `Command::Stop`, not an error.

use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum TrackError {
    #[error("detection model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("frame unavailable: {0}")]
    FrameUnavailable(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TrackError {
    /// True for failures that must abort before the control loop starts.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_) | Self::Config(_))
    }

    /// Classify an arbitrary error chain as the end of the frame stream.
    ///
    /// Keeps an existing `TrackError::FrameUnavailable` as-is instead of nesting it.
    pub fn frame_unavailable(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<TrackError>() {
            Some(TrackError::FrameUnavailable(reason)) => Self::FrameUnavailable(reason.clone()),
            _ => Self::FrameUnavailable(format!("{:#}", err)),
        }
    }

    /// Classify an arbitrary error chain as a per-frame inference failure.
    pub fn inference(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<TrackError>() {
            Some(TrackError::Inference(reason)) => Self::Inference(reason.clone()),
            _ => Self::Inference(format!("{:#}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn fatal_classification() {
        assert!(TrackError::ModelUnavailable("x".into()).is_fatal());
        assert!(TrackError::Config("x".into()).is_fatal());
        assert!(!TrackError::FrameUnavailable("x".into()).is_fatal());
        assert!(!TrackError::Inference("x".into()).is_fatal());
    }

    #[test]
    fn frame_unavailable_is_not_nested() {
        let err = anyhow::Error::new(TrackError::FrameUnavailable("directory exhausted".into()));
        assert_eq!(
            TrackError::frame_unavailable(&err),
            TrackError::FrameUnavailable("directory exhausted".into())
        );
    }

    #[test]
    fn foreign_errors_keep_their_context_chain() {
        let err = Err::<(), _>(anyhow!("socket closed"))
            .context("read mjpeg chunk")
            .unwrap_err();
        assert_eq!(
            TrackError::frame_unavailable(&err),
            TrackError::FrameUnavailable("read mjpeg chunk: socket closed".into())
        );
    }
}
