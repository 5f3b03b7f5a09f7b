use crate::error::OcrError;
use image::DynamicImage;
use imageproc::filter::sharpen_gaussian;

/// Gaussian blur radius used for the unsharp mask
pub const SIGMA: f32 = 2.0;

/// Unsharp mask: `src + (src - blur(src))`
/// Pushes both sides of a stroke edge apart so glyph outlines stand out
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    let gray = image.into_luma8();
    Ok(DynamicImage::ImageLuma8(sharpen_gaussian(&gray, SIGMA, 1.0)))
}
