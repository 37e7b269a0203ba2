//! Object detection behind a swappable backend.
//!
//! Backends produce class-labelled boxes in frame pixel coordinates. Which
//! backend runs is a startup decision; see [`open_detector`].

mod backend;
pub mod backends;
pub mod labels;
pub mod preprocess;
mod result;
pub mod ssd;

pub use backend::Detector;
pub use backends::{BrightRegionBackend, ScriptedBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractSsdBackend;
pub use labels::{class_id_for, class_label, PERSON_CLASS_ID, VOC_CLASSES};
pub use preprocess::BlobParams;
pub use result::{BoundingBox, Detection};

use crate::config::{DetectorKind, DetectorSettings};
use crate::error::TrackError;

/// Build the configured detector. `target_class` is the label the model-free
/// backend reports for what it finds.
pub fn open_detector(
    settings: &DetectorSettings,
    target_class: u32,
) -> Result<Box<dyn Detector>, TrackError> {
    match settings.backend {
        DetectorKind::BrightRegion => Ok(Box::new(BrightRegionBackend::new(target_class))),
        DetectorKind::Tract => open_tract(settings),
    }
}

#[cfg(feature = "backend-tract")]
fn open_tract(settings: &DetectorSettings) -> Result<Box<dyn Detector>, TrackError> {
    let backend = TractSsdBackend::new(&settings.model_path, settings.input.clone())?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn open_tract(settings: &DetectorSettings) -> Result<Box<dyn Detector>, TrackError> {
    Err(TrackError::ModelUnavailable(format!(
        "{}: tract backend not compiled in (enable the backend-tract feature)",
        settings.model_path.display()
    )))
}
