//! Decoding and encoding helpers shared by the preprocessor and the backends

use crate::error::OcrError;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Decode JPEG/PNG/... bytes, sniffing the format from the content
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::Decode("image stream is empty".to_string()));
    }

    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OcrError::Decode(format!("Failed to sniff image format: {}", e)))?
        .decode()
        .map_err(|e| OcrError::Decode(e.to_string()))
}

/// Check that bytes hold a supported image without decoding pixel data
pub fn probe(bytes: &[u8]) -> Result<(ImageFormat, (u32, u32)), OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::Decode("image stream is empty".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OcrError::Decode(format!("Failed to sniff image format: {}", e)))?;
    let format = reader
        .format()
        .ok_or_else(|| OcrError::Decode("unrecognized image format".to_string()))?;
    let dimensions = reader
        .into_dimensions()
        .map_err(|e| OcrError::Decode(e.to_string()))?;

    Ok((format, dimensions))
}

/// Encode an image in memory
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, OcrError> {
    let mut data = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut data), format)
        .map_err(|e| {
            OcrError::io(
                format!("Failed to encode {:?}", format),
                std::io::Error::other(e),
            )
        })?;
    Ok(data)
}
