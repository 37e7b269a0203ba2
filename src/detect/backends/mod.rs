pub mod bright;
pub mod scripted;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use bright::BrightRegionBackend;
pub use scripted::ScriptedBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractSsdBackend;
