use crate::error::OcrError;
use image::{DynamicImage, GrayImage};

/// Contrast boost in percent
pub const PERCENT: f64 = 20.0;

/// Stretch luma values linearly away from mid-grey
///
/// Each value maps to `((v / 255 - 0.5) * (1 + PERCENT / 100) + 0.5) * 255`,
/// rounded and clamped to `0..=255`.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    let lut = lookup_table(PERCENT);

    let mut gray: GrayImage = image.into_luma8();
    for pixel in gray.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }

    Ok(DynamicImage::ImageLuma8(gray))
}

fn lookup_table(percent: f64) -> [u8; 256] {
    let alpha = 1.0 + percent.clamp(-100.0, 100.0) / 100.0;

    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let stretched = ((value as f64 / 255.0 - 0.5) * alpha + 0.5) * 255.0;
        *slot = (stretched + 0.5).clamp(0.0, 255.0) as u8;
    }
    lut
}
