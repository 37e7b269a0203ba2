use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::control::{Deadband, TargetCriteria};
use crate::detect::{class_id_for, BlobParams, PERSON_CLASS_ID};
use crate::error::TrackError;
use crate::pipeline::TrackingSettings;

const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
const DEFAULT_SOURCE_URL: &str = "stub://camera";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_MODEL_PATH: &str = "models/mobilenet_ssd.onnx";

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    target: Option<TargetConfigFile>,
    control: Option<ControlConfigFile>,
    detector: Option<DetectorConfigFile>,
    source: Option<SourceConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TargetConfigFile {
    class_id: Option<u32>,
    /// Class label, e.g. "person". Takes precedence over `class_id`.
    class: Option<String>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ControlConfigFile {
    deadband_px: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    scale: Option<f32>,
    mean: Option<[f32; 3]>,
    swap_rb: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    format: Option<String>,
}

/// Detector backend choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorKind {
    /// MobileNet-SSD through tract (feature: backend-tract).
    Tract,
    /// Model-free bright-region detector, pairs with `stub://` sources.
    BrightRegion,
}

impl FromStr for DetectorKind {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tract" | "ssd" => Ok(Self::Tract),
            "bright-region" | "bright" | "stub" => Ok(Self::BrightRegion),
            other => Err(TrackError::Config(format!(
                "unknown detector backend '{}'; expected tract or bright-region",
                other
            ))),
        }
    }
}

/// How cycle reports are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Log,
    JsonLines,
}

impl FromStr for OutputFormat {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "json" | "jsonl" | "json-lines" => Ok(Self::JsonLines),
            other => Err(TrackError::Config(format!(
                "unknown output format '{}'; expected log or json",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: DetectorKind,
    pub model_path: PathBuf,
    pub input: BlobParams,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// `stub://name`, `http(s)://...`, `/dev/videoN`, `v4l2://...`, or a local path.
    pub url: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            target_fps: DEFAULT_SOURCE_FPS,
            width: DEFAULT_SOURCE_WIDTH,
            height: DEFAULT_SOURCE_HEIGHT,
            max_frames: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub target_class_id: u32,
    pub min_confidence: f32,
    pub deadband_px: u32,
    pub detector: DetectorSettings,
    pub source: SourceSettings,
    pub output: OutputFormat,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            target_class_id: PERSON_CLASS_ID,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            deadband_px: Deadband::DEFAULT_PX,
            detector: DetectorSettings {
                backend: DetectorKind::BrightRegion,
                model_path: PathBuf::from(DEFAULT_MODEL_PATH),
                input: BlobParams::default(),
            },
            source: SourceSettings::default(),
            output: OutputFormat::Log,
        }
    }
}

impl TrackerConfig {
    /// Load from the file named by `TRACKER_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TRACKER_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load from an explicit file (or defaults), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => TrackerConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: TrackerConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let target = file.target.unwrap_or_default();
        let target_class_id = match target.class.as_deref() {
            Some(label) => resolve_class(label)?,
            None => target.class_id.unwrap_or(defaults.target_class_id),
        };

        let detector = file.detector.unwrap_or_default();
        let backend = match detector.backend.as_deref() {
            Some(name) => name.parse()?,
            None => defaults.detector.backend,
        };
        let default_input = defaults.detector.input;
        let input = BlobParams {
            width: detector.input_width.unwrap_or(default_input.width),
            height: detector.input_height.unwrap_or(default_input.height),
            scale: detector.scale.unwrap_or(default_input.scale),
            mean: detector.mean.unwrap_or(default_input.mean),
            swap_rb: detector.swap_rb.unwrap_or(default_input.swap_rb),
        };

        let source = file.source.unwrap_or_default();
        let source = SourceSettings {
            url: source.url.unwrap_or(defaults.source.url),
            target_fps: source.target_fps.unwrap_or(defaults.source.target_fps),
            width: source.width.unwrap_or(defaults.source.width),
            height: source.height.unwrap_or(defaults.source.height),
            max_frames: source.max_frames,
        };

        let output = match file.output.and_then(|output| output.format) {
            Some(format) => format.parse()?,
            None => defaults.output,
        };

        Ok(Self {
            target_class_id,
            min_confidence: target.min_confidence.unwrap_or(defaults.min_confidence),
            deadband_px: file
                .control
                .and_then(|control| control.deadband_px)
                .unwrap_or(defaults.deadband_px),
            detector: DetectorSettings {
                backend,
                model_path: detector.model_path.unwrap_or(defaults.detector.model_path),
                input,
            },
            source,
            output,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = non_empty_env("TRACKER_SOURCE_URL") {
            self.source.url = url;
        }
        if let Some(backend) = non_empty_env("TRACKER_DETECTOR") {
            self.detector.backend = backend.parse()?;
        }
        if let Some(path) = non_empty_env("TRACKER_MODEL_PATH") {
            self.detector.model_path = PathBuf::from(path);
        }
        if let Some(class) = non_empty_env("TRACKER_TARGET_CLASS") {
            self.target_class_id = match class.parse::<u32>() {
                Ok(id) => id,
                Err(_) => resolve_class(&class)?,
            };
        }
        if let Some(confidence) = non_empty_env("TRACKER_MIN_CONFIDENCE") {
            self.min_confidence = confidence.parse().map_err(|_| {
                TrackError::Config("TRACKER_MIN_CONFIDENCE must be a number".to_string())
            })?;
        }
        if let Some(deadband) = non_empty_env("TRACKER_DEADBAND_PX") {
            self.deadband_px = deadband.parse().map_err(|_| {
                TrackError::Config("TRACKER_DEADBAND_PX must be a whole number of pixels".to_string())
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(TrackError::Config(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        self.deadband()?;
        let input = &self.detector.input;
        if input.is_empty() {
            return Err(TrackError::Config(
                "detector input resolution must be non-zero".to_string(),
            ));
        }
        if !input.scale.is_finite() || input.scale <= 0.0 {
            return Err(TrackError::Config(format!(
                "detector scale must be positive, got {}",
                input.scale
            )));
        }
        if self.source.url.trim().is_empty() {
            return Err(TrackError::Config("source url must not be empty".to_string()));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(TrackError::Config(
                "source resolution must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn deadband(&self) -> Result<Deadband, TrackError> {
        Deadband::new(self.deadband_px).map_err(|err| TrackError::Config(err.to_string()))
    }

    pub fn tracking(&self) -> Result<TrackingSettings, TrackError> {
        Ok(TrackingSettings {
            criteria: TargetCriteria {
                class_id: self.target_class_id,
                min_confidence: self.min_confidence,
            },
            deadband: self.deadband()?,
        })
    }
}

fn resolve_class(label: &str) -> Result<u32, TrackError> {
    class_id_for(label)
        .ok_or_else(|| TrackError::Config(format!("unknown target class '{}'", label.trim())))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<TrackerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() -> Result<()> {
        let cfg = TrackerConfig::from_file(TrackerConfigFile::default())?;
        cfg.validate()?;
        assert_eq!(cfg.target_class_id, 15);
        assert_eq!(cfg.min_confidence, 0.7);
        assert_eq!(cfg.deadband_px, 50);
        assert_eq!((cfg.detector.input.width, cfg.detector.input.height), (300, 300));
        assert_eq!(cfg.output, OutputFormat::Log);
        Ok(())
    }

    #[test]
    fn class_label_resolves() -> Result<()> {
        let file: TrackerConfigFile = toml::from_str(
            r#"
            [target]
            class = "car"
            class_id = 15
            "#,
        )?;
        let cfg = TrackerConfig::from_file(file)?;
        assert_eq!(cfg.target_class_id, 7);
        Ok(())
    }

    #[test]
    fn rejects_unknown_backend_and_class() {
        let file: TrackerConfigFile = toml::from_str("[detector]\nbackend = \"yolo\"").unwrap();
        assert!(TrackerConfig::from_file(file).is_err());
        let file: TrackerConfigFile = toml::from_str("[target]\nclass = \"dragon\"").unwrap();
        assert!(TrackerConfig::from_file(file).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = TrackerConfig::default();
        cfg.deadband_px = 0;
        assert!(matches!(cfg.validate(), Err(TrackError::Config(_))));

        let mut cfg = TrackerConfig::default();
        cfg.min_confidence = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = TrackerConfig::default();
        cfg.detector.input.width = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tracking_settings_carry_thresholds() -> Result<()> {
        let mut cfg = TrackerConfig::default();
        cfg.deadband_px = 80;
        cfg.min_confidence = 0.5;
        let tracking = cfg.tracking()?;
        assert_eq!(tracking.deadband.pixels(), 80);
        assert_eq!(tracking.criteria.min_confidence, 0.5);
        assert_eq!(tracking.criteria.class_id, 15);
        Ok(())
    }
}
