use crate::engine::ImageStream;
use crate::error::OcrError;
use crate::raster;
use image::{DynamicImage, ImageFormat};
use std::time::Instant;

use super::steps;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: &'static str,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone)]
pub struct PreprocessingResult {
    pub image: DynamicImage,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Fixed preprocessing chain
///
/// Order matters: contrast runs after sharpening so halo artifacts are not
/// amplified before edges are enhanced.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Run grayscale, sharpen and contrast on a decoded image
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, OcrError> {
        let start = Instant::now();
        let mut timings = Vec::with_capacity(3);

        let mut img = image;
        img = self.run_step("grayscale", img, &mut timings, steps::grayscale::apply)?;
        img = self.run_step("sharpen", img, &mut timings, steps::sharpen::apply)?;
        img = self.run_step("contrast", img, &mut timings, steps::contrast::apply)?;

        Ok(PreprocessingResult {
            image: img,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        })
    }

    /// Decode a stream, preprocess it and encode the result as PNG
    ///
    /// PNG is lossless, so no compression artifacts are reintroduced ahead of
    /// recognition.
    pub fn optimize(&self, image: ImageStream<'_>) -> Result<Vec<u8>, OcrError> {
        let bytes = image.into_bytes()?;
        let decoded = raster::decode(&bytes)?;
        tracing::debug!(
            width = decoded.width(),
            height = decoded.height(),
            input_bytes = bytes.len(),
            "Decoded image for preprocessing"
        );

        let result = self.process(decoded)?;
        let steps: Vec<String> = result
            .steps
            .iter()
            .map(|step| format!("{}={}ms", step.name, step.time_ms))
            .collect();
        tracing::debug!(
            total_time_ms = result.total_time_ms,
            steps = %steps.join(" "),
            "Preprocessing finished"
        );

        raster::encode(&result.image, ImageFormat::Png)
    }

    fn run_step<F>(
        &self,
        name: &'static str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, OcrError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, OcrError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name,
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}
