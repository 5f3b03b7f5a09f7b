//! Text extraction backends
//!
//! Each backend implements `TextExtractor`. The backend for an invocation is
//! chosen once by `select` and handed to the conversion pipeline as a trait
//! object. The local engine is conditionally compiled based on feature flags.

pub mod cloud;
pub mod local;

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

#[cfg(test)]
pub mod mock;

use crate::config::Config;
use crate::engine::{Backend, TextExtractor};
use crate::error::OcrError;

/// Build the extractor for the selected backend
pub fn select(backend: Backend, config: &Config) -> Result<Box<dyn TextExtractor>, OcrError> {
    tracing::debug!(backend = backend.as_str(), "Selecting OCR backend");

    match backend {
        Backend::Cloud => Ok(Box::new(cloud::CloudBackend::new(config))),
        Backend::LocalOcr => local_backend(config),
    }
}

#[cfg(feature = "engine-tesseract")]
fn local_backend(config: &Config) -> Result<Box<dyn TextExtractor>, OcrError> {
    let factory = tesseract::TesseractFactory::new(config)?;
    Ok(Box::new(local::LocalOcrBackend::new(factory)))
}

#[cfg(not(feature = "engine-tesseract"))]
fn local_backend(_config: &Config) -> Result<Box<dyn TextExtractor>, OcrError> {
    Err(OcrError::ClientInit(
        "Local OCR is not available in this build. Rebuild with --features engine-tesseract"
            .to_string(),
    ))
}
