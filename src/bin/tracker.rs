//! tracker - follow a person with LEFT/RIGHT/CENTER/STOP commands
//!
//! This daemon:
//! 1. Loads configuration (TOML file, environment, command line)
//! 2. Loads the detector; a missing model is fatal
//! 3. Connects the frame source
//! 4. Runs one control cycle per frame until Ctrl-C or end of stream
//! 5. Emits each command as a log line or a JSON line on stdout

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use person_tracker::{
    open_detector, open_source, CommandSink, ControlLoop, Frame, FrameSource, JsonLinesSink,
    LogSink, OutputFormat, SourceStats, StopReason, TrackerConfig,
};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Steer a follower robot toward the most confident person in view")]
struct Args {
    /// TOML configuration file.
    #[arg(long, env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Frame source: stub://name, http://host/, /dev/videoN, or an image path.
    #[arg(long)]
    source: Option<String>,

    /// Detector backend: tract or bright-region.
    #[arg(long)]
    detector: Option<String>,

    /// ONNX MobileNet-SSD model for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Minimum detection confidence (exclusive).
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Half-width of the CENTER band in pixels.
    #[arg(long)]
    deadband: Option<u32>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Write one JSON object per cycle to stdout.
    #[arg(long)]
    json: bool,

    /// Capture the next frame while the current one is in inference.
    #[arg(long)]
    prefetch: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = TrackerConfig::load_from(args.config.as_deref())?;
    apply_args(&mut config, &args)?;
    config.validate()?;
    let settings = config.tracking()?;

    let detector = open_detector(&config.detector, config.target_class_id)?;
    let mut control = ControlLoop::new(detector, settings);
    control.warm_up()?;

    let mut source = open_source(&config.source)?;
    source.connect()?;

    log::info!(
        "tracker running. source={} detector={} class={} min_confidence={} deadband={}px",
        source.name(),
        control.detector_name(),
        config.target_class_id,
        config.min_confidence,
        config.deadband_px
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut sink: Box<dyn CommandSink> = match config.output {
        OutputFormat::Log => Box::new(LogSink),
        OutputFormat::JsonLines => Box::new(JsonLinesSink::new(io::stdout().lock())),
    };

    let source = HealthLogged::new(source);
    let summary = if args.prefetch {
        control.run_prefetched(source, sink.as_mut(), &cancel)?
    } else {
        let mut source = source;
        control.run(&mut source, sink.as_mut(), &cancel)?
    };

    log::info!(
        "tracker stopped after {} cycles: left={} right={} center={} stop={} inference_errors={}",
        summary.cycles,
        summary.commands.left,
        summary.commands.right,
        summary.commands.center,
        summary.commands.stop,
        summary.inference_errors
    );
    if let StopReason::EndOfStream(reason) = &summary.stop {
        log::info!("stream ended: {}", reason);
    }
    Ok(())
}

fn apply_args(config: &mut TrackerConfig, args: &Args) -> Result<()> {
    if let Some(source) = &args.source {
        config.source.url = source.clone();
    }
    if let Some(detector) = &args.detector {
        config.detector.backend = detector.parse()?;
    }
    if let Some(model) = &args.model {
        config.detector.model_path = model.clone();
    }
    if let Some(min_confidence) = args.min_confidence {
        config.min_confidence = min_confidence;
    }
    if let Some(deadband) = args.deadband {
        config.deadband_px = deadband;
    }
    if args.max_frames.is_some() {
        config.source.max_frames = args.max_frames;
    }
    if args.json {
        config.output = OutputFormat::JsonLines;
    }
    Ok(())
}

/// Logs source health every few seconds as frames are pulled.
struct HealthLogged<S> {
    inner: S,
    last_log: Instant,
}

impl<S: FrameSource> HealthLogged<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            last_log: Instant::now(),
        }
    }
}

impl<S: FrameSource> FrameSource for HealthLogged<S> {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn connect(&mut self) -> Result<()> {
        self.inner.connect()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let frame = self.inner.next_frame();
        if self.last_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = self.inner.stats();
            log::info!(
                "source health={} frames={} source={}",
                self.inner.is_healthy(),
                stats.frames_captured,
                stats.source
            );
            self.last_log = Instant::now();
        }
        frame
    }

    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }

    fn stats(&self) -> SourceStats {
        self.inner.stats()
    }
}
