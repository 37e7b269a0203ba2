use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::Detector;
use crate::detect::result::Detection;

/// Backend that replays prepared results instead of running a model.
///
/// Scripted entries are consumed one per frame; once the script is exhausted
/// every frame gets the fallback detections. `Err` entries simulate inference
/// failures.
#[derive(Default)]
pub struct ScriptedBackend {
    script: VecDeque<Result<Vec<Detection>, String>>,
    fallback: Vec<Detection>,
}

impl ScriptedBackend {
    /// Same detections for every frame.
    pub fn fixed(detections: Vec<Detection>) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: detections,
        }
    }

    pub fn from_script<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<Vec<Detection>, String>>,
    {
        Self {
            script: script.into_iter().collect(),
            fallback: Vec::new(),
        }
    }

    pub fn then_fixed(mut self, detections: Vec<Detection>) -> Self {
        self.fallback = detections;
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Detector for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        match self.script.pop_front() {
            Some(Ok(detections)) => Ok(detections),
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => Ok(self.fallback.clone()),
        }
    }
}
