//! Output boundary: where each cycle's command goes.
//!
//! Actuator drivers, displays and loggers implement `CommandSink`.

use anyhow::{Context, Result};
use std::io::Write;

use crate::control::Command;
use crate::pipeline::CycleReport;

pub trait CommandSink {
    fn emit(&mut self, report: &CycleReport) -> Result<()>;

    /// Called once when the loop stops.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Human-readable line per cycle through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl CommandSink for LogSink {
    fn emit(&mut self, report: &CycleReport) -> Result<()> {
        match (&report.offset, &report.inference_error) {
            (Some(offset), _) => log::info!(
                "frame {}: Object Center: ({}, {}) | dx={} | Command: {}",
                report.sequence,
                offset.target_center.x,
                offset.target_center.y,
                offset.dx,
                report.command
            ),
            (None, Some(err)) => log::info!(
                "frame {}: No person detected ({}) | Command: {}",
                report.sequence,
                err,
                report.command
            ),
            (None, None) => log::info!(
                "frame {}: No person detected | Command: {}",
                report.sequence,
                report.command
            ),
        }
        Ok(())
    }
}

/// One JSON object per line, for piping into an actuator bridge.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for JsonLinesSink<W> {
    fn emit(&mut self, report: &CycleReport) -> Result<()> {
        serde_json::to_writer(&mut self.writer, report).context("serialize cycle report")?;
        self.writer
            .write_all(b"\n")
            .context("write cycle report")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("flush cycle reports")
    }
}

/// Collects reports in memory.
impl CommandSink for Vec<CycleReport> {
    fn emit(&mut self, report: &CycleReport) -> Result<()> {
        self.push(report.clone());
        Ok(())
    }
}

/// Commands only, in emission order.
pub fn commands(reports: &[CycleReport]) -> Vec<Command> {
    reports.iter().map(|r| r.command).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Offset, Point};

    fn report(command: Command, offset: Option<Offset>) -> CycleReport {
        CycleReport {
            sequence: 3,
            frame_width: 640,
            frame_height: 480,
            command,
            target: None,
            offset,
            candidates: 0,
            inference_error: None,
            latency_us: 12,
        }
    }

    #[test]
    fn json_lines_are_newline_delimited() -> Result<()> {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(&report(Command::Stop, None))?;
        sink.emit(&report(
            Command::Right,
            Some(Offset {
                dx: 80,
                dy: 0,
                target_center: Point { x: 400, y: 240 },
                frame_center: Point { x: 320, y: 240 },
            }),
        ))?;
        sink.flush()?;

        let out = String::from_utf8(sink.into_inner())?;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0])?;
        assert_eq!(first["command"], "STOP");
        assert!(first["offset"].is_null());

        let second: serde_json::Value = serde_json::from_str(lines[1])?;
        assert_eq!(second["command"], "RIGHT");
        assert_eq!(second["offset"]["dx"], 80);
        Ok(())
    }

    #[test]
    fn vec_sink_keeps_order() -> Result<()> {
        let mut sink: Vec<CycleReport> = Vec::new();
        sink.emit(&report(Command::Left, None))?;
        sink.emit(&report(Command::Center, None))?;
        assert_eq!(commands(&sink), vec![Command::Left, Command::Center]);
        Ok(())
    }
}
