#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::Detector;
use crate::detect::preprocess::{build_blob, BlobParams};
use crate::detect::result::Detection;
use crate::detect::ssd::decode_ssd_output;
use crate::error::TrackError;

/// Tract-based MobileNet-SSD backend for ONNX models.
///
/// The model is loaded and optimised once; afterwards it is only read. Expected
/// output is the SSD `DetectionOutput` tensor `[1, 1, N, 7]`.
pub struct TractSsdBackend {
    model: TypedRunnableModel<TypedModel>,
    params: BlobParams,
}

impl TractSsdBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    ///
    /// Any failure here is `TrackError::ModelUnavailable`.
    pub fn new<P: AsRef<Path>>(model_path: P, params: BlobParams) -> Result<Self, TrackError> {
        let model_path = model_path.as_ref();
        let model = load_plan(model_path, &params)
            .map_err(|err| TrackError::ModelUnavailable(format!("{:#}", err)))?;
        log::info!(
            "TractSsdBackend: loaded {} ({}x{} input)",
            model_path.display(),
            params.width,
            params.height
        );
        Ok(Self { model, params })
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let blob = build_blob(pixels, width, height, &self.params)?;
        let input = tract_ndarray::Array4::from_shape_vec(
            (1, 3, self.params.height as usize, self.params.width as usize),
            blob,
        )
        .context("blob does not match model input shape")?;
        Ok(input.into_tensor())
    }

    fn extract_rows(&self, outputs: TVec<TValue>) -> Result<Vec<f32>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        Ok(rows.iter().copied().collect())
    }
}

fn load_plan(
    model_path: &Path,
    params: &BlobParams,
) -> Result<TypedRunnableModel<TypedModel>> {
    if params.is_empty() {
        return Err(anyhow!("model input resolution must be non-zero"));
    }
    tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(
                f32::datum_type(),
                tvec!(1, 3, params.height as usize, params.width as usize),
            ),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}

impl Detector for TractSsdBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let rows = self.extract_rows(outputs)?;
        decode_ssd_output(&rows, width, height)
    }

    fn warm_up(&mut self) -> Result<()> {
        let (w, h) = (self.params.width, self.params.height);
        let pixels = vec![0u8; 3 * w as usize * h as usize];
        self.detect(&pixels, w, h).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_unavailable() {
        let err = TractSsdBackend::new("/nonexistent/mobilenet_ssd.onnx", BlobParams::default())
            .err()
            .expect("load must fail");
        assert!(matches!(err, TrackError::ModelUnavailable(_)));
        assert!(err.is_fatal());
    }
}
