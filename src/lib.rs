//! Person tracker
//!
//! Turns a stream of camera frames into a stream of steering commands for a
//! follower robot: LEFT, RIGHT, CENTER or STOP, one per frame.
//!
//! # Architecture
//!
//! Each control cycle runs the same fixed pipeline:
//!
//! 1. **Acquire**: a `FrameSource` yields one immutable RGB8 `Frame`.
//! 2. **Detect**: a `Detector` backend returns class-labelled boxes.
//! 3. **Select**: the most confident detection of the target class above the threshold.
//! 4. **Offset**: signed horizontal distance of the target center from the frame center.
//! 5. **Decide**: a symmetric deadband maps the offset to a command.
//! 6. **Emit**: a `CommandSink` receives the command with its cycle report.
//!
//! Steps 3 to 5 are pure functions; everything with side effects sits at the
//! source, detector and sink seams.
//!
//! # Module Structure
//!
//! - `frame`: frame ownership for one cycle
//! - `ingest`: frame sources (synthetic, image files, HTTP/MJPEG, V4L2)
//! - `detect`: detector trait, backends, SSD decoding, class labels
//! - `control`: target selection, offset, deadband decision
//! - `pipeline`: the control loop and its run summary
//! - `sink`: command outputs
//! - `config`: TOML + environment configuration
//! - `error`: failure taxonomy

pub mod config;
pub mod control;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod sink;

pub use config::{DetectorKind, DetectorSettings, OutputFormat, SourceSettings, TrackerConfig};
pub use control::{compute_offset, decide, select_target, Command, Deadband, Offset, Point, TargetCriteria};
pub use detect::{open_detector, BoundingBox, Detection, Detector};
pub use error::TrackError;
pub use frame::Frame;
pub use ingest::{open_source, FrameSource, LimitedSource, SourceStats};
pub use pipeline::{CommandCounts, ControlLoop, CycleReport, RunSummary, StopReason, TrackingSettings};
pub use sink::{CommandSink, JsonLinesSink, LogSink};
