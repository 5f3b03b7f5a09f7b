use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};

/// Drop chrominance and keep luminance only
///
/// Uses Rec.601 weights (0.299, 0.587, 0.114), rounded to nearest. Alpha is
/// discarded. Every later step works on the single luma channel.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    let rgb = image.into_rgb8();
    let gray = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        Luma([(luma + 0.5).min(255.0) as u8])
    });
    Ok(DynamicImage::ImageLuma8(gray))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_grayscale_collapses_channels() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 0]));

        let result = apply(DynamicImage::ImageRgb8(img)).unwrap();
        assert!(matches!(result, DynamicImage::ImageLuma8(_)));

        let gray = result.to_luma8();
        assert_eq!(gray.get_pixel(1, 0).0[0], 0);
        assert_eq!(gray.get_pixel(3, 3).0[0], 255);
    }

    #[test]
    fn test_grayscale_uses_rec601_weights() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));

        let gray = apply(DynamicImage::ImageRgb8(img)).unwrap().to_luma8();

        // 0.299 * 255 = 76.2, 0.587 * 255 = 149.7, 0.114 * 255 = 29.1
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 29);
    }

    #[test]
    fn test_grayscale_preserves_dimensions() {
        let img = RgbImage::new(100, 50);
        let result = apply(DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(result.width(), 100);
        assert_eq!(result.height(), 50);
    }
}
