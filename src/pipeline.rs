//! Control loop: frame -> detect -> select -> offset -> decide -> emit.
//!
//! One cycle runs to completion before the next frame is requested, so the
//! frame source sees natural backpressure. Cancellation is cooperative and is
//! checked at the top of every cycle.

use anyhow::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Instant;

use crate::control::{compute_offset, decide, Command, Deadband, Offset, TargetCriteria};
use crate::detect::{Detection, Detector};
use crate::error::TrackError;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::sink::CommandSink;

/// Decision parameters shared by every cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TrackingSettings {
    pub criteria: TargetCriteria,
    pub deadband: Deadband,
}

/// Everything one cycle produced, handed to the output sink.
#[derive(Clone, Debug, Serialize)]
pub struct CycleReport {
    pub sequence: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub command: Command,
    /// Selected target, absent when the command is STOP.
    pub target: Option<Detection>,
    pub offset: Option<Offset>,
    /// Number of raw candidates the detector returned.
    pub candidates: usize,
    /// Set when inference failed and the cycle ran with zero detections.
    pub inference_error: Option<TrackError>,
    pub latency_us: u64,
}

impl CycleReport {
    pub fn is_degraded(&self) -> bool {
        self.inference_error.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CommandCounts {
    pub left: u64,
    pub right: u64,
    pub center: u64,
    pub stop: u64,
}

impl CommandCounts {
    fn record(&mut self, command: Command) {
        match command {
            Command::Left => self.left += 1,
            Command::Right => self.right += 1,
            Command::Center => self.center += 1,
            Command::Stop => self.stop += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.left + self.right + self.center + self.stop
    }
}

/// Why the loop stopped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Cancelled,
    EndOfStream(TrackError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cycles: u64,
    pub commands: CommandCounts,
    pub inference_errors: u64,
    pub stop: StopReason,
}

#[derive(Default)]
struct Tally {
    commands: CommandCounts,
    inference_errors: u64,
}

impl Tally {
    fn finish(self, stop: StopReason) -> RunSummary {
        RunSummary {
            cycles: self.commands.total(),
            commands: self.commands,
            inference_errors: self.inference_errors,
            stop,
        }
    }
}

/// Owns the detector for the lifetime of a run.
pub struct ControlLoop {
    detector: Box<dyn Detector>,
    settings: TrackingSettings,
}

impl ControlLoop {
    pub fn new(detector: Box<dyn Detector>, settings: TrackingSettings) -> Self {
        Self { detector, settings }
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Run the detector's warm-up hook. A failure here means the model is unusable.
    pub fn warm_up(&mut self) -> Result<(), TrackError> {
        self.detector
            .warm_up()
            .map_err(|err| TrackError::ModelUnavailable(format!("{:#}", err)))
    }

    /// Run one cycle on `frame`. Always yields exactly one command.
    pub fn process(&mut self, frame: &Frame) -> CycleReport {
        let started = Instant::now();
        let (detections, inference_error) = match frame.run_detector(self.detector.as_mut()) {
            Ok(detections) => (detections, None),
            Err(err) => {
                let err = TrackError::inference(&err);
                log::warn!(
                    "frame {}: {}; treating as zero detections",
                    frame.sequence,
                    err
                );
                (Vec::new(), Some(err))
            }
        };

        let target = self.settings.criteria.select(&detections).cloned();
        let offset = target
            .as_ref()
            .map(|t| compute_offset(t, frame.width, frame.height));
        let command = decide(offset.as_ref(), self.settings.deadband);

        CycleReport {
            sequence: frame.sequence,
            frame_width: frame.width,
            frame_height: frame.height,
            command,
            target,
            offset,
            candidates: detections.len(),
            inference_error,
            latency_us: started.elapsed().as_micros() as u64,
        }
    }

    fn emit<K: CommandSink + ?Sized>(
        &mut self,
        frame: Frame,
        sink: &mut K,
        tally: &mut Tally,
    ) -> Result<()> {
        let report = self.process(&frame);
        drop(frame);
        tally.commands.record(report.command);
        if report.is_degraded() {
            tally.inference_errors += 1;
        }
        sink.emit(&report)
    }

    /// Drive cycles until `cancel` is set or the source runs dry.
    ///
    /// A source error is end of stream, not a failure. Sink errors abort the run.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K, cancel: &AtomicBool) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: CommandSink + ?Sized,
    {
        let mut tally = Tally::default();
        let stop = loop {
            if cancel.load(Ordering::SeqCst) {
                break StopReason::Cancelled;
            }
            let frame = match source.next_frame() {
                Ok(frame) => frame,
                Err(err) => break StopReason::EndOfStream(TrackError::frame_unavailable(&err)),
            };
            self.emit(frame, sink, &mut tally)?;
        };
        finish_run(sink, tally, stop)
    }

    /// Like [`ControlLoop::run`], but captures the next frame while the current
    /// one is in inference.
    ///
    /// The capture thread hands frames over a one-slot channel, so at most one
    /// frame waits and commands are emitted in frame arrival order.
    pub fn run_prefetched<S, K>(&mut self, mut source: S, sink: &mut K, cancel: &AtomicBool) -> Result<RunSummary>
    where
        S: FrameSource + Send,
        K: CommandSink + ?Sized,
    {
        let (tx, rx) = mpsc::sync_channel::<Result<Frame, TrackError>>(1);
        std::thread::scope(|scope| {
            scope.spawn(move || loop {
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                let next = source
                    .next_frame()
                    .map_err(|err| TrackError::frame_unavailable(&err));
                let ended = next.is_err();
                if tx.send(next).is_err() || ended {
                    break;
                }
            });

            let mut tally = Tally::default();
            let stop = loop {
                if cancel.load(Ordering::SeqCst) {
                    break StopReason::Cancelled;
                }
                match rx.recv() {
                    Ok(Ok(frame)) => self.emit(frame, sink, &mut tally)?,
                    Ok(Err(reason)) => break StopReason::EndOfStream(reason),
                    // Capture thread only hangs up after observing the flag.
                    Err(_) => break StopReason::Cancelled,
                }
            };
            drop(rx);
            finish_run(sink, tally, stop)
        })
    }
}

fn finish_run<K: CommandSink + ?Sized>(sink: &mut K, tally: Tally, stop: StopReason) -> Result<RunSummary> {
    match &stop {
        StopReason::Cancelled => log::info!("control loop cancelled"),
        StopReason::EndOfStream(reason) => log::info!("control loop reached end of stream: {}", reason),
    }
    sink.flush()?;
    Ok(tally.finish(stop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, ScriptedBackend};

    fn person(x: i32, y: i32, w: u32, h: u32, confidence: f32) -> Detection {
        Detection::new(BoundingBox::new(x, y, w, h), 15, confidence).unwrap()
    }

    fn control(detector: ScriptedBackend) -> ControlLoop {
        ControlLoop::new(Box::new(detector), TrackingSettings::default())
    }

    fn frame(sequence: u64) -> Frame {
        Frame::filled(640, 480, [0, 0, 0], sequence).unwrap()
    }

    #[test]
    fn centered_person_is_center() {
        let mut ctl = control(ScriptedBackend::fixed(vec![person(270, 200, 100, 100, 0.9)]));
        let report = ctl.process(&frame(1));
        assert_eq!(report.command, Command::Center);
        assert_eq!(report.offset.unwrap().dx, 0);
        assert!(!report.is_degraded());
    }

    #[test]
    fn person_on_the_left_is_left() {
        let mut ctl = control(ScriptedBackend::fixed(vec![person(100, 200, 50, 50, 0.9)]));
        let report = ctl.process(&frame(1));
        assert_eq!(report.command, Command::Left);
        assert_eq!(report.offset.unwrap().dx, -195);
    }

    #[test]
    fn only_other_classes_is_stop() {
        let car = Detection::new(BoundingBox::new(0, 0, 50, 50), 7, 0.99).unwrap();
        let weak_person = person(270, 200, 100, 100, 0.7);
        let mut ctl = control(ScriptedBackend::fixed(vec![car, weak_person]));
        let report = ctl.process(&frame(1));
        assert_eq!(report.command, Command::Stop);
        assert_eq!(report.candidates, 2);
        assert!(report.target.is_none());
        assert!(!report.is_degraded());
    }

    #[test]
    fn inference_failure_degrades_to_stop_and_is_flagged() {
        let mut ctl = control(ScriptedBackend::from_script([Err("tensor shape".to_string())]));
        let report = ctl.process(&frame(1));
        assert_eq!(report.command, Command::Stop);
        assert_eq!(
            report.inference_error,
            Some(TrackError::Inference("tensor shape".into()))
        );
    }

    #[test]
    fn pre_cancelled_loop_requests_no_frames() -> Result<()> {
        struct Unreachable;
        impl FrameSource for Unreachable {
            fn name(&self) -> String {
                "unreachable".into()
            }
            fn next_frame(&mut self) -> Result<Frame> {
                panic!("source polled after cancellation");
            }
        }

        let mut ctl = control(ScriptedBackend::default());
        let mut sink: Vec<CycleReport> = Vec::new();
        let cancel = AtomicBool::new(true);
        let summary = ctl.run(&mut Unreachable, &mut sink, &cancel)?;
        assert_eq!(summary.stop, StopReason::Cancelled);
        assert_eq!(summary.cycles, 0);
        assert!(sink.is_empty());
        Ok(())
    }
}
