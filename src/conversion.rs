//! Image-to-text conversion pipeline
//!
//! Runs an image through optional preprocessing and then through whichever
//! `TextExtractor` the caller selected. The pipeline never looks at which
//! backend it was given.
//!
//! A configured header is written and flushed before extraction starts. If
//! extraction fails afterwards the header stays in the output and no text
//! follows it.

use crate::engine::{ImageStream, TextExtractor};
use crate::error::{OcrError, PipelineError, Stage};
use crate::preprocessing::Preprocessor;
use std::io::Write;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct ConversionPipeline {
    header: Option<Vec<u8>>,
    preprocess: bool,
}

impl ConversionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written ahead of the extracted text
    pub fn with_header(mut self, header: Vec<u8>) -> Self {
        self.header = Some(header);
        self
    }

    /// Run grayscale/sharpen/contrast before extraction
    pub fn with_preprocessing(mut self, enabled: bool) -> Self {
        self.preprocess = enabled;
        self
    }

    /// Write header (if any) and extracted text to `sink`
    pub fn run(
        &self,
        image: ImageStream<'_>,
        extractor: &dyn TextExtractor,
        sink: &mut dyn Write,
    ) -> Result<(), PipelineError> {
        self.write_header(sink)?;
        self.write_text(image, extractor, sink)
    }

    /// Write and flush the header, if one is configured
    ///
    /// Callers that still have to pick a backend or open the input call this
    /// first, so the header reaches the output whatever fails afterwards.
    pub fn write_header(&self, sink: &mut dyn Write) -> Result<(), PipelineError> {
        if let Some(header) = &self.header {
            write_all(sink, header, "Failed to write header")
                .map_err(|e| PipelineError::new(Stage::Header, e))?;
            tracing::debug!(bytes = header.len(), "Header written");
        }
        Ok(())
    }

    /// Extract text and write it to `sink` without the header
    pub fn write_text(
        &self,
        image: ImageStream<'_>,
        extractor: &dyn TextExtractor,
        sink: &mut dyn Write,
    ) -> Result<(), PipelineError> {
        let text = self.extract(image, extractor)?;

        write_all(sink, text.as_bytes(), "Failed to write text")
            .map_err(|e| PipelineError::new(Stage::Output, e))
    }

    /// Extract text without header or sink
    pub fn extract(
        &self,
        image: ImageStream<'_>,
        extractor: &dyn TextExtractor,
    ) -> Result<String, PipelineError> {
        let image = self.prepare(image)?;

        let start = Instant::now();
        let text = extractor
            .extract(image)
            .map_err(|e| PipelineError::new(Stage::Extract, e))?;

        tracing::info!(
            backend = extractor.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "Text extracted"
        );

        Ok(text)
    }

    fn prepare<'a>(&self, image: ImageStream<'a>) -> Result<ImageStream<'a>, PipelineError> {
        if !self.preprocess {
            return Ok(image);
        }

        let png = Preprocessor::new()
            .optimize(image)
            .map_err(|e| PipelineError::new(Stage::Preprocess, e))?;
        Ok(ImageStream::from_bytes(png))
    }
}

fn write_all(sink: &mut dyn Write, bytes: &[u8], context: &str) -> Result<(), OcrError> {
    sink.write_all(bytes)
        .and_then(|_| sink.flush())
        .map_err(|e| OcrError::io(context, e))
}
