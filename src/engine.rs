use crate::error::OcrError;
use std::fmt;
use std::io::Read;

/// Encoded raster image (JPEG, PNG, ...) that can be read exactly once
pub struct ImageStream<'a> {
    reader: Box<dyn Read + 'a>,
}

impl<'a> ImageStream<'a> {
    pub fn new(reader: impl Read + 'a) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    /// Read the whole stream into memory, consuming it
    pub fn into_bytes(mut self) -> Result<Vec<u8>, OcrError> {
        let mut bytes = Vec::new();
        self.reader
            .read_to_end(&mut bytes)
            .map_err(|e| OcrError::io("Failed to read image", e))?;
        Ok(bytes)
    }
}

impl ImageStream<'static> {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(std::io::Cursor::new(bytes))
    }
}

impl fmt::Debug for ImageStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStream").finish_non_exhaustive()
    }
}

/// Which text extractor an invocation uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Google Cloud Vision document text detection
    #[default]
    Cloud,
    /// Local Tesseract engine
    LocalOcr,
}

impl Backend {
    #[cfg(test)]
    pub const ALL: [Backend; 2] = [Backend::Cloud, Backend::LocalOcr];

    /// Map the `--tesseract` switch onto a backend
    pub fn from_tesseract_flag(use_tesseract: bool) -> Self {
        if use_tesseract {
            Self::LocalOcr
        } else {
            Self::Cloud
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::LocalOcr => "tesseract",
        }
    }
}

/// Trait that both OCR backends implement
///
/// Implementations hold configuration only. Any client or engine handle is
/// acquired inside `extract` and released before it returns.
pub trait TextExtractor: Send + Sync {
    /// Returns the backend identifier (e.g., "cloud", "tesseract")
    fn name(&self) -> &'static str;

    /// Consume an encoded image and return the recognized text
    fn extract(&self, image: ImageStream<'_>) -> Result<String, OcrError>;
}
